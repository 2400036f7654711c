//! Routing slip NSF processing
//!
//! For every NSF slip: each invoice paid from the slip reverts to CREATED
//! with its receipts removed and a fresh ACTIVE reference recreated, the
//! payments fail, and the slip is debited the NSF fee. Rerunning finds no
//! paid invoices left and assesses nothing twice.

use tracing::info;

use domain_ledger::{InvoiceReference, InvoiceStatus, RoutingSlip, RoutingSlipStatus};

use crate::context::JobContext;
use crate::result::JobRunResult;

pub async fn run(ctx: &JobContext) -> JobRunResult {
    let mut result = JobRunResult::new("ROUTING_SLIP_NSF");

    let nsf_slips = match ctx
        .payment
        .ledger
        .routing_slips_by_status(RoutingSlipStatus::Nsf)
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure("query", err);
            return result.finish(ctx).await;
        }
    };
    info!(count = nsf_slips.len(), "NSF routing slips found");

    for mut slip in nsf_slips {
        if let Some(account_id) = slip.account_id {
            if ctx.skips_account(account_id) {
                result.record_skipped();
                continue;
            }
        }
        match process_slip(ctx, &mut slip).await {
            Ok(0) => result.record_skipped(),
            Ok(reverted) => {
                info!(slip = %slip.number, reverted, "NSF reversal applied");
                result.record_processed();
            }
            Err(err) => result.record_failure(slip.number.clone(), err),
        }
    }

    result.finish(ctx).await
}

/// Reverts the slip's paid invoices; returns how many were reverted
async fn process_slip(ctx: &JobContext, slip: &mut RoutingSlip) -> Result<usize, String> {
    let invoices = ctx
        .payment
        .ledger
        .invoices_for_routing_slip(&slip.number)
        .await
        .map_err(|e| e.to_string())?;

    let mut reverted = 0usize;
    for mut invoice in invoices {
        if invoice.status != InvoiceStatus::Paid {
            continue;
        }

        let references = ctx
            .payment
            .ledger
            .references_for_invoice(invoice.id)
            .await
            .map_err(|e| e.to_string())?;
        let invoice_number = references
            .last()
            .map(|r| r.invoice_number.clone())
            .unwrap_or_default();

        invoice.revert_for_nsf().map_err(|e| e.to_string())?;

        ctx.payment
            .ledger
            .delete_receipts_for_invoice(invoice.id)
            .await
            .map_err(|e| e.to_string())?;

        for mut reference in references {
            reference.cancel();
            ctx.payment
                .ledger
                .save_reference(&reference)
                .await
                .map_err(|e| e.to_string())?;
        }
        if !invoice_number.is_empty() {
            let recreated = InvoiceReference::new(invoice.id, invoice_number.clone());
            ctx.payment
                .ledger
                .save_reference(&recreated)
                .await
                .map_err(|e| e.to_string())?;

            let payments = ctx
                .payment
                .ledger
                .payments_for_invoice_number(&invoice_number)
                .await
                .map_err(|e| e.to_string())?;
            for mut payment in payments {
                payment.fail();
                ctx.payment
                    .ledger
                    .save_payment(&payment)
                    .await
                    .map_err(|e| e.to_string())?;
            }
        }

        ctx.payment
            .ledger
            .save_invoice(&invoice)
            .await
            .map_err(|e| e.to_string())?;
        reverted += 1;
    }

    if reverted > 0 {
        let fee = core_kernel::Money::cad(ctx.settings.nsf_fee);
        slip.apply_nsf_fee(fee).map_err(|e| e.to_string())?;
        ctx.payment
            .ledger
            .save_routing_slip(slip)
            .await
            .map_err(|e| e.to_string())?;
    }

    Ok(reverted)
}
