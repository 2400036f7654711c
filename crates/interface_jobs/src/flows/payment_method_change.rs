//! Payment-method switching
//!
//! Orchestrates a method change across the account, CFS provisioning and
//! statement domains: evaluates the transition plan, retires/provisions
//! CFS rows, closes the running statement cycle with an interim statement
//! when the account moves to EFT, and publishes the method-change event.
//! First-time PAD entry only stores the future method; the activation job
//! finalizes it after the confirmation period.

use tracing::info;

use domain_account::{apply_method_change, plan_method_change, BankDetails, CfsAccount};
use domain_ledger::{InvoiceStatus, PaymentMethod};
use domain_payment::{LedgerEvent, PaymentError};
use domain_statement::{generate_statements, period_for, StatementFrequency, StatementPeriod, StatementSettings};

use crate::context::JobContext;

const STATEMENT_STATUSES: [InvoiceStatus; 6] = [
    InvoiceStatus::Created,
    InvoiceStatus::Approved,
    InvoiceStatus::SettlementScheduled,
    InvoiceStatus::Paid,
    InvoiceStatus::Partial,
    InvoiceStatus::Overdue,
];

/// Switches an account to a new payment method
pub async fn switch_payment_method(
    ctx: &JobContext,
    account_id: core_kernel::AccountId,
    new_method: PaymentMethod,
    bank_details: Option<BankDetails>,
) -> Result<(), PaymentError> {
    let now = ctx.now();
    let mut account = ctx
        .payment
        .accounts
        .account(account_id)
        .await
        .map_err(PaymentError::Store)?;
    let effective_cfs = ctx
        .payment
        .accounts
        .effective_cfs_account(account_id)
        .await
        .map_err(PaymentError::Store)?;

    let plan = plan_method_change(
        &account,
        effective_cfs.as_ref(),
        new_method,
        ctx.settings.pad_confirmation_days,
        now,
    )?;
    let from = account.effective_payment_method(now);

    if plan.new_cfs_required {
        if let Some(mut old) = effective_cfs {
            // append-only history: never mutate bank details in place
            old.deactivate()?;
            ctx.payment
                .accounts
                .save_cfs_account(&old)
                .await
                .map_err(PaymentError::Store)?;
        }
        let mut fresh = CfsAccount::pending(account_id, new_method);
        if let Some(details) = bank_details {
            fresh = fresh.with_bank_details(details);
        }
        ctx.payment
            .accounts
            .save_cfs_account(&fresh)
            .await
            .map_err(PaymentError::Store)?;
    }

    if plan.interim_statement {
        close_cycle_with_interim(ctx, &account).await?;
    }

    apply_method_change(&mut account, &plan);
    ctx.payment
        .accounts
        .save_account(&account)
        .await
        .map_err(PaymentError::Store)?;

    // a deferred PAD switch announces its method change at activation time
    if plan.pad_activation_date.is_none() {
        let _ = ctx
            .payment
            .events
            .publish(LedgerEvent::PaymentMethodChanged {
                account_id,
                from,
                to: new_method,
            })
            .await;
    }
    info!(account_id = %account_id, %from, to = %new_method, "payment method switched");
    Ok(())
}

/// Closes the running statement cycle and pins the account to monthly
async fn close_cycle_with_interim(
    ctx: &JobContext,
    account: &domain_account::PaymentAccount,
) -> Result<(), PaymentError> {
    let today = ctx.today();
    let mut settings = match ctx
        .statements
        .settings_on(account.id, today)
        .await
        .map_err(PaymentError::Store)?
    {
        Some(settings) => settings,
        None => StatementSettings::new(account.id, StatementFrequency::default_frequency(), today),
    };

    // the interim statement covers the cycle start through today
    let current = period_for(settings.frequency, settings.frequency.cycle_end(today) + chrono::Duration::days(1));
    let period = StatementPeriod {
        from_date: current.from_date,
        to_date: today,
    };

    let invoices = ctx
        .payment
        .ledger
        .account_invoices_by_status(account.id, &STATEMENT_STATUSES)
        .await
        .map_err(PaymentError::Store)?;
    for statement in generate_statements(account.id, settings.frequency, period, &invoices, true) {
        ctx.statements
            .save_statement(&statement)
            .await
            .map_err(PaymentError::Store)?;
    }

    let admins = ctx
        .payment
        .org
        .admin_emails(&account.auth_account_id)
        .await
        .unwrap_or_default();
    let mut next = settings
        .change_frequency(StatementFrequency::Monthly, today)
        .map_err(|e| PaymentError::Store(core_kernel::PortError::validation(e.to_string())))?;
    next.enable_for_eft(admins);

    ctx.statements
        .save_settings(&settings)
        .await
        .map_err(PaymentError::Store)?;
    ctx.statements
        .save_settings(&next)
        .await
        .map_err(PaymentError::Store)?;
    Ok(())
}
