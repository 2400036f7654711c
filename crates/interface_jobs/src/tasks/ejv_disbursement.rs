//! EJV disbursement
//!
//! Three passes over the partner-disbursement rows:
//!
//! 1. reversal creation - refunded invoices whose original disbursement
//!    COMPLETED get a reversal row; an UPLOADED-but-unconfirmed original
//!    defers the reversal to a later run
//! 2. upload - waiting rows past the settlement cooldown are grouped by GL
//!    batch type into one journal-voucher file; a build failure persists
//!    no partial file
//! 3. confirmation - uploaded rows whose file the fiscal system accepted
//!    advance to COMPLETED

use std::collections::BTreeMap;

use chrono::Duration;
use tracing::info;

use domain_distribution::{EjvFile, EjvHeader, EjvLink, EjvLinkTarget, PartnerDisbursement};
use domain_ledger::{DisbursementStatus, Invoice, InvoiceStatus};
use domain_payment::error::classify_fiscal_error;

use crate::context::JobContext;
use crate::result::JobRunResult;

pub async fn run(ctx: &JobContext) -> JobRunResult {
    let mut result = JobRunResult::new("EJV_DISBURSEMENT");

    create_reversals(ctx, &mut result).await;
    upload_pending(ctx, &mut result).await;
    confirm_uploaded(ctx, &mut result).await;

    result.finish(ctx).await
}

/// Reversal rows for refunded invoices whose disbursement completed
async fn create_reversals(ctx: &JobContext, result: &mut JobRunResult) {
    let refunded = match ctx
        .payment
        .ledger
        .invoices_by_status(InvoiceStatus::Refunded, None)
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure("reversal query", err);
            return;
        }
    };

    for mut invoice in refunded {
        if ctx.skips_account(invoice.account_id) {
            continue;
        }
        match invoice.disbursement_status {
            Some(DisbursementStatus::Completed) => {}
            Some(DisbursementStatus::Uploaded) => {
                // reversal is ordered strictly after COMPLETED; defer
                result.record_skipped();
                continue;
            }
            _ => continue,
        }

        let existing = match ctx
            .payment
            .disbursements
            .disbursements_for_invoice(invoice.id)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                result.record_failure(invoice.id.to_string(), err);
                continue;
            }
        };
        if existing.iter().any(|d| d.is_reversal) {
            continue;
        }
        let Some(original) = existing.iter().find(|d| !d.is_reversal) else {
            continue;
        };

        let reversal = PartnerDisbursement::new(invoice.id, original.amount, true);
        if let Err(err) = ctx.payment.disbursements.save_disbursement(&reversal).await {
            result.record_failure(invoice.id.to_string(), err);
            continue;
        }
        invoice.disbursement_status = Some(DisbursementStatus::Reversed);
        if let Err(err) = ctx.payment.ledger.save_invoice(&invoice).await {
            result.record_failure(invoice.id.to_string(), err);
            continue;
        }
        result.record_processed();
    }
}

/// Builds and uploads one JV file covering every eligible waiting row
async fn upload_pending(ctx: &JobContext, result: &mut JobRunResult) {
    let now = ctx.now();
    let cooldown = Duration::days(ctx.settings.disbursement_delay_days);

    let waiting = match ctx
        .payment
        .disbursements
        .disbursements_by_status(DisbursementStatus::WaitingForJob)
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure("upload query", err);
            return;
        }
    };
    if waiting.is_empty() {
        return;
    }

    // gather rows + invoices, enforcing the settlement cooldown
    let mut batches: BTreeMap<String, Vec<(PartnerDisbursement, Invoice)>> = BTreeMap::new();
    let mut build_errors = 0usize;
    for row in waiting {
        let invoice = match ctx.payment.ledger.invoice(row.invoice_id).await {
            Ok(invoice) => invoice,
            Err(err) => {
                result.record_failure(row.id.to_string(), err);
                build_errors += 1;
                continue;
            }
        };
        if ctx.skips_account(invoice.account_id) {
            continue;
        }
        if !row.is_reversal {
            let eligible = invoice
                .payment_date
                .map_or(false, |settled| settled + cooldown <= now);
            if !eligible {
                result.record_skipped();
                continue;
            }
        }
        let batch_type = invoice.corp_type.as_str().to_string();
        batches.entry(batch_type).or_default().push((row, invoice));
    }
    if build_errors > 0 {
        // never persist a partial file
        return;
    }
    if batches.is_empty() {
        return;
    }

    let file = EjvFile::new(format!("JV{}", &file_token()));
    let mut headers = Vec::new();
    let mut links = Vec::new();
    let mut content = String::new();

    for (batch_type, rows) in &batches {
        let total = rows
            .iter()
            .fold(core_kernel::Money::zero(rows[0].1.total.currency()), |acc, (row, _)| {
                acc + row.amount
            });
        let header = EjvHeader::new(file.id, batch_type.clone(), total);
        for (row, invoice) in rows {
            links.push(EjvLink::new(
                header.id,
                EjvLinkTarget::Invoice(invoice.id),
                row.amount,
            ));
            let direction = if row.is_reversal { "R" } else { "D" };
            content.push_str(&format!(
                "{}|{}|{}|{}\n",
                batch_type,
                invoice.id,
                row.amount.amount(),
                direction
            ));
        }
        headers.push(header);
    }

    if let Err(err) = ctx
        .payment
        .fiscal
        .upload_journal_voucher(&file.file_ref, &content)
        .await
    {
        // nothing persisted; the next run rebuilds from the same rows
        result.record_failure(file.file_ref.clone(), classify_fiscal_error(err));
        return;
    }
    info!(file_ref = %file.file_ref, batches = batches.len(), "journal voucher uploaded");

    let mut uploaded_file = file;
    uploaded_file.status = DisbursementStatus::Uploaded;
    if let Err(err) = ctx.payment.disbursements.save_ejv_file(&uploaded_file).await {
        result.record_failure(uploaded_file.file_ref.clone(), err);
        return;
    }
    for header in &headers {
        let mut header = header.clone();
        header.status = DisbursementStatus::Uploaded;
        let _ = ctx.payment.disbursements.save_ejv_header(&header).await;
    }
    for link in &links {
        let mut link = link.clone();
        link.status = DisbursementStatus::Uploaded;
        let _ = ctx.payment.disbursements.save_ejv_link(&link).await;
    }

    for rows in batches.into_values() {
        for (mut row, mut invoice) in rows {
            if let Err(err) = row.mark_uploaded(&uploaded_file.file_ref, now) {
                result.record_failure(row.id.to_string(), err);
                continue;
            }
            if let Err(err) = ctx.payment.disbursements.save_disbursement(&row).await {
                result.record_failure(row.id.to_string(), err);
                continue;
            }
            if !row.is_reversal {
                invoice.disbursement_status = Some(DisbursementStatus::Uploaded);
                let _ = ctx.payment.ledger.save_invoice(&invoice).await;
            }
            result.record_processed();
        }
    }
}

/// Advances uploaded rows whose file the fiscal system has accepted
async fn confirm_uploaded(ctx: &JobContext, result: &mut JobRunResult) {
    let uploaded = match ctx
        .payment
        .disbursements
        .disbursements_by_status(DisbursementStatus::Uploaded)
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure("confirm query", err);
            return;
        }
    };

    let mut by_file: BTreeMap<String, Vec<PartnerDisbursement>> = BTreeMap::new();
    for row in uploaded {
        let Some(file_ref) = row.file_ref.clone() else {
            continue;
        };
        by_file.entry(file_ref).or_default().push(row);
    }

    for (file_ref, rows) in by_file {
        let status = match ctx.payment.fiscal.get_journal_voucher_status(&file_ref).await {
            Ok(status) => status,
            Err(err) => {
                result.record_failure(file_ref.clone(), classify_fiscal_error(err));
                continue;
            }
        };
        if status != Some(DisbursementStatus::Completed) {
            // not accepted yet; try again next run
            for _ in &rows {
                result.record_skipped();
            }
            continue;
        }
        for mut row in rows {
            if let Err(err) = row.mark_completed() {
                result.record_failure(row.id.to_string(), err);
                continue;
            }
            if let Err(err) = ctx.payment.disbursements.save_disbursement(&row).await {
                result.record_failure(row.id.to_string(), err);
                continue;
            }
            if !row.is_reversal {
                if let Ok(mut invoice) = ctx.payment.ledger.invoice(row.invoice_id).await {
                    invoice.disbursement_status = Some(DisbursementStatus::Completed);
                    let _ = ctx.payment.ledger.save_invoice(&invoice).await;
                }
            }
            result.record_processed();
        }
    }
}

fn file_token() -> String {
    core_kernel::EjvFileId::new_v7()
        .as_uuid()
        .simple()
        .to_string()[..12]
        .to_uppercase()
}
