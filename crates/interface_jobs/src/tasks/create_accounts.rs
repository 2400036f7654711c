//! Fiscal account creation
//!
//! Provisions the fiscal customer profile and site for every PENDING CFS
//! account. A recognized bad-bank-account rejection deactivates the row
//! and mails the account holder; an unrecognized or transient failure
//! leaves the row PENDING so the next run retries, with no email.

use serde_json::json;
use tracing::info;

use domain_account::{CfsAccount, CfsAccountStatus, PaymentAccount};
use domain_payment::error::{classify_fiscal_error, FISCAL_CODE_INVALID_BANK_ACCOUNT};
use domain_payment::{
    ContactInfo, EmailMessage, NotificationTemplate, PaymentContext, PaymentError,
};

use crate::context::JobContext;
use crate::result::JobRunResult;

pub async fn run(ctx: &JobContext) -> JobRunResult {
    let mut result = JobRunResult::new("CREATE_ACCOUNTS");

    let pending = match ctx
        .payment
        .accounts
        .cfs_accounts_by_status(CfsAccountStatus::Pending)
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure("query", err);
            return result.finish(ctx).await;
        }
    };
    info!(count = pending.len(), "pending CFS accounts found");

    for mut cfs in pending {
        if ctx.skips_account(cfs.account_id) {
            result.record_skipped();
            continue;
        }
        let account = match ctx.payment.accounts.account(cfs.account_id).await {
            Ok(account) => account,
            Err(err) => {
                result.record_failure(cfs.id.to_string(), err);
                continue;
            }
        };

        match provision(&ctx.payment, &account, &mut cfs).await {
            Ok(()) => {
                if let Err(err) = ctx.payment.accounts.save_cfs_account(&cfs).await {
                    result.record_failure(cfs.id.to_string(), err);
                    continue;
                }
                result.record_processed();
            }
            Err(PaymentError::FiscalBusiness { code, message })
                if code == FISCAL_CODE_INVALID_BANK_ACCOUNT =>
            {
                // account-holder problem, not ours: retire the row and tell them
                if cfs.deactivate().is_ok() {
                    let _ = ctx.payment.accounts.save_cfs_account(&cfs).await;
                }
                notify_holder(ctx, &account, &message).await;
                result.record_processed();
            }
            Err(err) => {
                // leave PENDING; the next scheduled run retries
                result.record_failure(cfs.id.to_string(), err);
            }
        }
    }

    result.finish(ctx).await
}

async fn provision(
    payment: &PaymentContext,
    account: &PaymentAccount,
    cfs: &mut CfsAccount,
) -> Result<(), PaymentError> {
    let contact = ContactInfo {
        name: account.name.clone(),
        email: None,
        city: None,
        province: None,
        postal_code: None,
    };
    let profile = payment
        .fiscal
        .create_customer_profile(account, &contact)
        .await
        .map_err(classify_fiscal_error)?;
    let site = payment
        .fiscal
        .create_site(&profile, cfs.bank_details.as_ref())
        .await
        .map_err(classify_fiscal_error)?;
    cfs.provisioned(profile.account_number, profile.party_number, site)?;
    Ok(())
}

async fn notify_holder(ctx: &JobContext, account: &PaymentAccount, reason: &str) {
    let recipients = ctx
        .payment
        .org
        .admin_emails(&account.auth_account_id)
        .await
        .unwrap_or_default();
    if recipients.is_empty() {
        return;
    }
    let message = EmailMessage {
        template: NotificationTemplate::AccountProvisioningFailed,
        recipients,
        params: json!({
            "accountName": account.name,
            "reason": reason,
        }),
    };
    let _ = ctx.payment.mailer.send(message).await;
}
