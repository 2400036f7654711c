//! PAD activation
//!
//! Promotes PENDING_PAD_ACTIVATION rows to ACTIVE once the confirmation
//! period has passed, finalizes any deferred payment-method switch on the
//! account, and emits the method-change activity exactly once at the
//! moment of promotion - the status precondition makes a second run a
//! no-op for already-promoted rows.

use chrono::Duration;
use serde_json::json;
use tracing::info;

use domain_account::CfsAccountStatus;
use domain_ledger::PaymentMethod;
use domain_payment::{EmailMessage, LedgerEvent, NotificationTemplate};

use crate::context::JobContext;
use crate::result::JobRunResult;

pub async fn run(ctx: &JobContext) -> JobRunResult {
    let mut result = JobRunResult::new("ACTIVATE_PAD_ACCOUNTS");
    let now = ctx.now();

    let pending = match ctx
        .payment
        .accounts
        .cfs_accounts_by_status(CfsAccountStatus::PendingPadActivation)
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure("query", err);
            return result.finish(ctx).await;
        }
    };
    info!(count = pending.len(), "CFS accounts pending PAD activation");

    for mut cfs in pending {
        if ctx.skips_account(cfs.account_id) {
            result.record_skipped();
            continue;
        }
        let mut account = match ctx.payment.accounts.account(cfs.account_id).await {
            Ok(account) => account,
            Err(err) => {
                result.record_failure(cfs.id.to_string(), err);
                continue;
            }
        };

        // an hour of grace keeps a same-day cron rerun from waiting a full day
        let period_over = account
            .pad_activation_date
            .map_or(true, |activation| activation - Duration::hours(1) < now);
        info!(account_id = %account.id, period_over, "PAD activation check");
        if !period_over {
            result.record_skipped();
            continue;
        }

        if let Err(err) = cfs.transition_to(CfsAccountStatus::Active) {
            result.record_failure(cfs.id.to_string(), err);
            continue;
        }
        match ctx.payment.accounts.save_cfs_account(&cfs).await {
            Ok(()) => {}
            Err(err) if err.is_conflict() => {
                // another run already promoted this row
                result.record_skipped();
                continue;
            }
            Err(err) => {
                result.record_failure(cfs.id.to_string(), err);
                continue;
            }
        }

        // the rail settlement ran on while the confirmation period lasted
        let effective_before = account
            .previous_payment_method
            .unwrap_or(account.payment_method);
        account.complete_pad_activation();
        if let Err(err) = ctx.payment.accounts.save_account(&account).await {
            result.record_failure(account.id.to_string(), err);
            continue;
        }

        if effective_before != PaymentMethod::Pad {
            let _ = ctx
                .payment
                .events
                .publish(LedgerEvent::PaymentMethodChanged {
                    account_id: account.id,
                    from: effective_before,
                    to: PaymentMethod::Pad,
                })
                .await;
        }

        let recipients = ctx
            .payment
            .org
            .admin_emails(&account.auth_account_id)
            .await
            .unwrap_or_default();
        if !recipients.is_empty() {
            let _ = ctx
                .payment
                .mailer
                .send(EmailMessage {
                    template: NotificationTemplate::PaymentMethodConfirmed,
                    recipients,
                    params: json!({ "accountName": account.name }),
                })
                .await;
        }

        result.record_processed();
    }

    result.finish(ctx).await
}
