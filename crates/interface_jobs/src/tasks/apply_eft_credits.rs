//! EFT credit application
//!
//! For every EFT account, applies matched deposit credits to outstanding
//! invoices oldest-invoice-first. Settling the last overdue invoice
//! unlocks a frozen account and publishes the unlock event once.

use domain_account::CfsAccountStatus;
use domain_ledger::{InvoiceStatus, PaymentMethod};
use domain_payment::systems::EftService;
use domain_payment::LedgerEvent;
use tracing::info;

use crate::context::JobContext;
use crate::result::JobRunResult;

const OUTSTANDING: [InvoiceStatus; 4] = [
    InvoiceStatus::Approved,
    InvoiceStatus::SettlementScheduled,
    InvoiceStatus::Overdue,
    InvoiceStatus::Partial,
];

pub async fn run(ctx: &JobContext) -> JobRunResult {
    let mut result = JobRunResult::new("APPLY_EFT_CREDITS");
    let now = ctx.now();
    let service = EftService::new(ctx.payment.clone());

    let accounts = match ctx
        .payment
        .accounts
        .accounts_by_method(Some(PaymentMethod::Eft))
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure("query", err);
            return result.finish(ctx).await;
        }
    };

    for account in accounts {
        if ctx.skips_account(account.id) {
            result.record_skipped();
            continue;
        }
        let mut outstanding = match ctx
            .payment
            .ledger
            .account_invoices_by_status(account.id, &OUTSTANDING)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                result.record_failure(account.id.to_string(), err);
                continue;
            }
        };
        // oldest invoice settles first, matching accounting expectations
        outstanding.sort_by_key(|invoice| invoice.created_at);

        let mut had_overdue = false;
        let mut settled_any = false;
        for mut invoice in outstanding {
            had_overdue |= invoice.status == InvoiceStatus::Overdue;
            match service.apply_credit(&mut invoice, now).await {
                Ok(applied) if applied.is_zero() => {
                    // credits exhausted for this account
                    result.record_skipped();
                    break;
                }
                Ok(_) => {
                    settled_any |= invoice.status == InvoiceStatus::Paid;
                    result.record_processed();
                }
                Err(err) => {
                    result.record_failure(invoice.id.to_string(), err);
                    break;
                }
            }
        }

        if had_overdue && settled_any {
            unlock_if_clear(ctx, account.id, &mut result).await;
        }
    }

    result.finish(ctx).await
}

/// Unfreezes the account once no overdue invoices remain
async fn unlock_if_clear(
    ctx: &JobContext,
    account_id: core_kernel::AccountId,
    result: &mut JobRunResult,
) {
    let still_overdue = match ctx
        .payment
        .ledger
        .account_invoices_by_status(account_id, &[InvoiceStatus::Overdue])
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure(account_id.to_string(), err);
            return;
        }
    };
    if !still_overdue.is_empty() {
        return;
    }

    let Ok(Some(mut cfs)) = ctx.payment.accounts.effective_cfs_account(account_id).await else {
        return;
    };
    if cfs.status != CfsAccountStatus::Freeze {
        return;
    }
    if cfs.transition_to(CfsAccountStatus::Active).is_err() {
        return;
    }
    if ctx.payment.accounts.save_cfs_account(&cfs).await.is_err() {
        return;
    }
    info!(account_id = %account_id, "account unlocked after overdue cleared");
    let _ = ctx
        .payment
        .events
        .publish(LedgerEvent::AccountUnlocked { account_id })
        .await;
}
