//! Refund GL confirmation
//!
//! Polls the fiscal GL status for invoices sitting in REFUND_REQUESTED
//! (direct pay and drawdown refunds). A PAID or COMPLETE posting finishes
//! the refund; a DECLINED posting stores the GL error on the refund row
//! and leaves the invoice for the next poll. An ambiguous or empty
//! response transitions nothing.

use tracing::{info, warn};

use domain_ledger::{Invoice, InvoiceStatus, PaymentMethod};
use domain_payment::error::classify_fiscal_error;
use domain_payment::{release_reversal, RefundPostingState};

use crate::context::JobContext;
use crate::result::JobRunResult;

const POLLED_METHODS: [PaymentMethod; 2] = [PaymentMethod::DirectPay, PaymentMethod::Drawdown];

pub async fn run(ctx: &JobContext) -> JobRunResult {
    let mut result = JobRunResult::new("REFUND_CONFIRMATION");

    for method in POLLED_METHODS {
        let outstanding = match ctx
            .payment
            .ledger
            .invoices_by_status(InvoiceStatus::RefundRequested, Some(method))
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                result.record_failure(format!("{} query", method), err);
                continue;
            }
        };
        info!(method = %method, count = outstanding.len(), "refunds awaiting GL confirmation");

        for mut invoice in outstanding {
            if ctx.skips_account(invoice.account_id) {
                result.record_skipped();
                continue;
            }
            match poll_one(ctx, &mut invoice).await {
                Ok(true) => result.record_processed(),
                Ok(false) => result.record_skipped(),
                Err(err) => result.record_failure(invoice.id.to_string(), err),
            }
        }
    }

    result.finish(ctx).await
}

async fn poll_one(ctx: &JobContext, invoice: &mut Invoice) -> Result<bool, String> {
    let references = ctx
        .payment
        .ledger
        .references_for_invoice(invoice.id)
        .await
        .map_err(|e| e.to_string())?;
    let Some(reference) = references.into_iter().last() else {
        return Err("no invoice reference to poll".to_string());
    };

    let gl_status = ctx
        .payment
        .fiscal
        .get_refund_status(&reference.invoice_number)
        .await
        .map_err(|e| classify_fiscal_error(e).to_string())?;

    let refund = ctx
        .payment
        .ledger
        .refund_for_invoice(invoice.id)
        .await
        .map_err(|e| e.to_string())?;

    match gl_status.state {
        Some(RefundPostingState::Paid) | Some(RefundPostingState::Complete) => {
            let now = ctx.now();
            let amount = refund.as_ref().map(|r| r.amount).unwrap_or(invoice.total);
            invoice.mark_refunded(amount, now).map_err(|e| e.to_string())?;

            if let Some(mut refund) = refund {
                refund.record_gl_posted(now);
                ctx.payment
                    .ledger
                    .save_refund(&refund)
                    .await
                    .map_err(|e| e.to_string())?;
            }

            let payments = ctx
                .payment
                .ledger
                .payments_for_invoice_number(&reference.invoice_number)
                .await
                .map_err(|e| e.to_string())?;
            for mut payment in payments {
                payment.mark_refunded();
                ctx.payment
                    .ledger
                    .save_payment(&payment)
                    .await
                    .map_err(|e| e.to_string())?;
            }

            ctx.payment
                .ledger
                .save_invoice(invoice)
                .await
                .map_err(|e| e.to_string())?;
            release_reversal(&ctx.payment, invoice).await;
            Ok(true)
        }
        Some(RefundPostingState::Declined) => {
            let message = gl_status
                .gl_error
                .unwrap_or_else(|| "GL declined the refund posting".to_string());
            warn!(invoice_id = %invoice.id, %message, "refund GL rejected");
            if let Some(mut refund) = refund {
                refund.record_gl_error(message);
                ctx.payment
                    .ledger
                    .save_refund(&refund)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            // invoice stays REFUND_REQUESTED for the next poll
            Ok(true)
        }
        None => Ok(false),
    }
}
