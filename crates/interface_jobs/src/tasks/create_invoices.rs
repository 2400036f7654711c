//! Fiscal invoice creation
//!
//! PAD: batches every approved invoice per account created before the
//! daily cutoff into one consolidated fiscal invoice. Online banking and
//! EFT: one fiscal invoice per ledger invoice. An invoice that already
//! carries an ACTIVE reference is never re-invoiced, and a blocked
//! account (frozen, overdue) is skipped whole until the block clears.

use std::collections::BTreeMap;

use tracing::info;

use core_kernel::{AccountId, Money};
use domain_distribution::build_gl_lines;
use domain_ledger::{Invoice, InvoiceReference, InvoiceStatus, PaymentMethod};
use domain_payment::error::classify_fiscal_error;
use domain_payment::{ensure_no_payment_blockers, FiscalInvoiceRequest};

use crate::context::JobContext;
use crate::result::JobRunResult;

pub async fn run(ctx: &JobContext) -> JobRunResult {
    let mut result = JobRunResult::new("CREATE_INVOICES");

    create_pad_invoices(ctx, &mut result).await;
    create_single_invoices(ctx, PaymentMethod::OnlineBanking, InvoiceStatus::Created, &mut result)
        .await;
    create_single_invoices(ctx, PaymentMethod::Eft, InvoiceStatus::Approved, &mut result).await;

    result.finish(ctx).await
}

/// One consolidated fiscal invoice per account for PAD
async fn create_pad_invoices(ctx: &JobContext, result: &mut JobRunResult) {
    let cutoff = ctx.now();
    let eligible = match ctx
        .payment
        .ledger
        .invoices_by_status(InvoiceStatus::Approved, Some(PaymentMethod::Pad))
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure("pad query", err);
            return;
        }
    };

    let mut by_account: BTreeMap<AccountId, Vec<Invoice>> = BTreeMap::new();
    for invoice in eligible {
        if invoice.created_at >= cutoff {
            continue;
        }
        by_account.entry(invoice.account_id).or_default().push(invoice);
    }
    info!(accounts = by_account.len(), "PAD accounts with approved invoices");

    for (account_id, invoices) in by_account {
        if ctx.skips_account(account_id) {
            result.record_skipped();
            continue;
        }
        if let Err(err) = create_account_batch(ctx, account_id, invoices, result).await {
            result.record_failure(account_id.to_string(), err);
        }
    }
}

async fn create_account_batch(
    ctx: &JobContext,
    account_id: AccountId,
    invoices: Vec<Invoice>,
    result: &mut JobRunResult,
) -> Result<(), String> {
    let account = ctx
        .payment
        .accounts
        .account(account_id)
        .await
        .map_err(|e| e.to_string())?;

    if ensure_no_payment_blockers(&ctx.payment, &account).await.is_err() {
        // frozen or overdue: nothing is invoiced until the block clears
        result.record_skipped();
        return Ok(());
    }

    let mut fresh = Vec::new();
    for invoice in invoices {
        if has_active_reference(ctx, &invoice).await? {
            result.record_skipped();
        } else {
            fresh.push(invoice);
        }
    }
    if fresh.is_empty() {
        return Ok(());
    }

    let cfs = ctx
        .payment
        .accounts
        .effective_cfs_account(account_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "no effective CFS account".to_string())?;

    let codes = ctx
        .payment
        .distributions
        .distribution_codes()
        .await
        .map_err(|e| e.to_string())?;
    let mut gl_lines = Vec::new();
    let mut total = Money::zero(fresh[0].total.currency());
    for invoice in &fresh {
        total = total + invoice.total;
        gl_lines.extend(build_gl_lines(&invoice.line_items, &codes).map_err(|e| e.to_string())?);
    }

    let invoice_number = consolidated_number("PAD", &fresh[0]);
    ctx.payment
        .fiscal
        .create_invoice(FiscalInvoiceRequest {
            account_number: cfs.cfs_account.clone().unwrap_or_default(),
            site_number: cfs.cfs_site.clone().unwrap_or_default(),
            invoice_number: invoice_number.clone(),
            total,
            gl_lines,
        })
        .await
        .map_err(|e| classify_fiscal_error(e).to_string())?;

    for mut invoice in fresh {
        let reference = InvoiceReference::new(invoice.id, invoice_number.clone());
        if let Err(err) = ctx.payment.ledger.save_reference(&reference).await {
            result.record_failure(invoice.id.to_string(), err);
            continue;
        }
        if let Err(err) = invoice.transition_to(InvoiceStatus::SettlementScheduled) {
            result.record_failure(invoice.id.to_string(), err);
            continue;
        }
        match ctx.payment.ledger.save_invoice(&invoice).await {
            Ok(()) => result.record_processed(),
            Err(err) if err.is_conflict() => result.record_skipped(),
            Err(err) => result.record_failure(invoice.id.to_string(), err),
        }
    }
    Ok(())
}

/// One fiscal invoice per ledger invoice for push-based methods
async fn create_single_invoices(
    ctx: &JobContext,
    method: PaymentMethod,
    eligible_status: InvoiceStatus,
    result: &mut JobRunResult,
) {
    let eligible = match ctx
        .payment
        .ledger
        .invoices_by_status(eligible_status, Some(method))
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure(format!("{} query", method), err);
            return;
        }
    };

    for mut invoice in eligible {
        if ctx.skips_account(invoice.account_id) {
            result.record_skipped();
            continue;
        }
        match create_one(ctx, &mut invoice, method).await {
            Ok(true) => result.record_processed(),
            Ok(false) => result.record_skipped(),
            Err(err) => result.record_failure(invoice.id.to_string(), err),
        }
    }
}

async fn create_one(
    ctx: &JobContext,
    invoice: &mut Invoice,
    method: PaymentMethod,
) -> Result<bool, String> {
    if has_active_reference(ctx, invoice).await? {
        return Ok(false);
    }
    let account = ctx
        .payment
        .accounts
        .account(invoice.account_id)
        .await
        .map_err(|e| e.to_string())?;
    if ensure_no_payment_blockers(&ctx.payment, &account).await.is_err() {
        return Ok(false);
    }
    let cfs = ctx
        .payment
        .accounts
        .effective_cfs_account(invoice.account_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "no effective CFS account".to_string())?;

    let codes = ctx
        .payment
        .distributions
        .distribution_codes()
        .await
        .map_err(|e| e.to_string())?;
    let gl_lines = build_gl_lines(&invoice.line_items, &codes).map_err(|e| e.to_string())?;

    let prefix = match method {
        PaymentMethod::Eft => "EFT",
        _ => "OB",
    };
    let invoice_number = consolidated_number(prefix, invoice);
    ctx.payment
        .fiscal
        .create_invoice(FiscalInvoiceRequest {
            account_number: cfs.cfs_account.clone().unwrap_or_default(),
            site_number: cfs.cfs_site.clone().unwrap_or_default(),
            invoice_number: invoice_number.clone(),
            total: invoice.total,
            gl_lines,
        })
        .await
        .map_err(|e| classify_fiscal_error(e).to_string())?;

    let reference = InvoiceReference::new(invoice.id, invoice_number);
    ctx.payment
        .ledger
        .save_reference(&reference)
        .await
        .map_err(|e| e.to_string())?;
    invoice
        .transition_to(InvoiceStatus::SettlementScheduled)
        .map_err(|e| e.to_string())?;
    match ctx.payment.ledger.save_invoice(invoice).await {
        Ok(()) => Ok(true),
        Err(err) if err.is_conflict() => Ok(false),
        Err(err) => Err(err.to_string()),
    }
}

async fn has_active_reference(ctx: &JobContext, invoice: &Invoice) -> Result<bool, String> {
    let references = ctx
        .payment
        .ledger
        .references_for_invoice(invoice.id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(references.iter().any(|r| r.is_active()))
}

fn consolidated_number(prefix: &str, first: &Invoice) -> String {
    format!(
        "{}{}",
        prefix,
        &first.id.as_uuid().simple().to_string()[..10].to_uppercase()
    )
}
