//! Payment-method transition rules and deletion guards
//!
//! Pure decision logic: callers apply the returned plan to the account,
//! provision CFS rows, and hand the statement flags to the statement
//! engine. Nothing here performs I/O.

use chrono::{DateTime, Duration, Utc};

use domain_ledger::PaymentMethod;
use tracing::info;

use crate::cfs_account::{CfsAccount, CfsAccountStatus};
use crate::error::AccountError;
use crate::payment_account::PaymentAccount;

/// The actions a payment-method change requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodChangePlan {
    pub new_method: PaymentMethod,
    /// Provision a fresh CFS row (and retire the old one when present)
    pub new_cfs_required: bool,
    /// End of the PAD confirmation period, for first-time PAD entry
    pub pad_activation_date: Option<DateTime<Utc>>,
    /// The method that stays effective until activation completes
    pub hold_previous_method: Option<PaymentMethod>,
    /// Close out the current statement cycle before the new cadence starts
    pub interim_statement: bool,
    /// EFT always reports monthly
    pub force_monthly_statements: bool,
}

/// Evaluates a payment-method change against the transition matrix
///
/// Rules:
/// - a fresh CFS row is needed when no effective row exists, when moving
///   between fiscal-profile methods that differ, or when entering one from
///   a non-fiscal method
/// - first-time PAD entry starts the confirmation clock; re-entry after a
///   completed activation does not
/// - switching to EFT closes the running statement cycle and forces a
///   monthly cadence
pub fn plan_method_change(
    account: &PaymentAccount,
    effective_cfs: Option<&CfsAccount>,
    new_method: PaymentMethod,
    confirmation_days: i64,
    now: DateTime<Utc>,
) -> Result<MethodChangePlan, AccountError> {
    let current = account.payment_method;
    if current == new_method {
        return Err(AccountError::UnsupportedMethodChange {
            from: current.to_string(),
            to: new_method.to_string(),
        });
    }

    // internal settlement accounts never change method
    if current == PaymentMethod::Internal || new_method == PaymentMethod::Internal {
        return Err(AccountError::UnsupportedMethodChange {
            from: current.to_string(),
            to: new_method.to_string(),
        });
    }

    let new_cfs_required = match effective_cfs {
        None => new_method.requires_fiscal_profile(),
        Some(cfs) => {
            new_method.requires_fiscal_profile() && cfs.payment_method != new_method
        }
    };

    let (pad_activation_date, hold_previous_method) =
        if new_method == PaymentMethod::Pad && !account.pad_activated {
            info!(
                account_id = %account.id,
                confirmation_days,
                "starting PAD confirmation period"
            );
            (
                Some(now + Duration::days(confirmation_days)),
                Some(current),
            )
        } else {
            (None, None)
        };

    let to_eft = new_method == PaymentMethod::Eft;

    Ok(MethodChangePlan {
        new_method,
        new_cfs_required,
        pad_activation_date,
        hold_previous_method,
        interim_statement: to_eft,
        force_monthly_statements: to_eft,
    })
}

/// Applies a change plan to the account's stored fields
pub fn apply_method_change(account: &mut PaymentAccount, plan: &MethodChangePlan) {
    account.payment_method = plan.new_method;
    if let Some(previous) = plan.hold_previous_method {
        account.previous_payment_method = Some(previous);
    }
    if let Some(date) = plan.pad_activation_date {
        account.pad_activation_date = Some(date);
    }
    account.updated_at = Utc::now();
}

/// Refuses account deletion while money facts remain unresolved
///
/// An account cannot be deleted while it holds credit, while its effective
/// CFS row is frozen, or while unsettled transactions exist inside the
/// configured lookback window.
pub fn ensure_deletable(
    account: &PaymentAccount,
    effective_cfs: Option<&CfsAccount>,
    unsettled_transactions: usize,
) -> Result<(), AccountError> {
    if account.has_credit() {
        return Err(AccountError::CreditBalanceOutstanding(account.id.to_string()));
    }
    if let Some(cfs) = effective_cfs {
        if cfs.status == CfsAccountStatus::Freeze {
            return Err(AccountError::AccountFrozen(account.id.to_string()));
        }
    }
    if unsettled_transactions > 0 {
        return Err(AccountError::OutstandingTransactions(
            account.id.to_string(),
            unsettled_transactions,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Money;
    use rust_decimal_macros::dec;

    fn account(method: PaymentMethod) -> PaymentAccount {
        PaymentAccount::new("auth-1", "Acme Filings", method)
    }

    fn active_cfs(account: &PaymentAccount, method: PaymentMethod) -> CfsAccount {
        let mut cfs = CfsAccount::pending(account.id, method);
        cfs.provisioned("1", "2", "3").unwrap();
        if cfs.status == CfsAccountStatus::PendingPadActivation {
            cfs.transition_to(CfsAccountStatus::Active).unwrap();
        }
        cfs
    }

    #[test]
    fn test_first_pad_entry_starts_confirmation_clock() {
        let now = Utc::now();
        let acct = account(PaymentMethod::Drawdown);

        let plan = plan_method_change(&acct, None, PaymentMethod::Pad, 3, now).unwrap();

        assert!(plan.new_cfs_required);
        assert_eq!(plan.pad_activation_date, Some(now + Duration::days(3)));
        assert_eq!(plan.hold_previous_method, Some(PaymentMethod::Drawdown));
    }

    #[test]
    fn test_pad_reentry_skips_confirmation() {
        let now = Utc::now();
        let mut acct = account(PaymentMethod::Pad);
        acct.complete_pad_activation();
        acct.payment_method = PaymentMethod::Drawdown;

        let cfs = active_cfs(&acct, PaymentMethod::Pad);
        let plan = plan_method_change(&acct, Some(&cfs), PaymentMethod::Pad, 3, now).unwrap();

        assert!(plan.pad_activation_date.is_none());
        assert!(plan.hold_previous_method.is_none());
        // existing PAD profile is reused
        assert!(!plan.new_cfs_required);
    }

    #[test]
    fn test_switch_between_fiscal_methods_provisions_new_row() {
        let now = Utc::now();
        let acct = account(PaymentMethod::OnlineBanking);
        let cfs = active_cfs(&acct, PaymentMethod::OnlineBanking);

        let plan = plan_method_change(&acct, Some(&cfs), PaymentMethod::Eft, 3, now).unwrap();
        assert!(plan.new_cfs_required);
        assert!(plan.interim_statement);
        assert!(plan.force_monthly_statements);
    }

    #[test]
    fn test_switch_to_drawdown_needs_no_fiscal_profile() {
        let now = Utc::now();
        let acct = account(PaymentMethod::Pad);
        let cfs = active_cfs(&acct, PaymentMethod::Pad);

        let plan = plan_method_change(&acct, Some(&cfs), PaymentMethod::Drawdown, 3, now).unwrap();
        assert!(!plan.new_cfs_required);
        assert!(!plan.interim_statement);
    }

    #[test]
    fn test_same_method_and_internal_rejected() {
        let now = Utc::now();
        let acct = account(PaymentMethod::Pad);
        assert!(plan_method_change(&acct, None, PaymentMethod::Pad, 3, now).is_err());
        assert!(plan_method_change(&acct, None, PaymentMethod::Internal, 3, now).is_err());
    }

    #[test]
    fn test_deletion_guards() {
        let mut acct = account(PaymentMethod::Pad);
        let mut cfs = active_cfs(&acct, PaymentMethod::Pad);

        acct.add_credit(Money::cad(dec!(5.00))).unwrap();
        assert!(matches!(
            ensure_deletable(&acct, Some(&cfs), 0),
            Err(AccountError::CreditBalanceOutstanding(_))
        ));

        acct.deduct_credit(Money::cad(dec!(5.00))).unwrap();
        cfs.transition_to(CfsAccountStatus::Freeze).unwrap();
        assert!(matches!(
            ensure_deletable(&acct, Some(&cfs), 0),
            Err(AccountError::AccountFrozen(_))
        ));

        cfs.transition_to(CfsAccountStatus::Active).unwrap();
        assert!(matches!(
            ensure_deletable(&acct, Some(&cfs), 2),
            Err(AccountError::OutstandingTransactions(_, 2))
        ));

        assert!(ensure_deletable(&acct, Some(&cfs), 0).is_ok());
    }

    #[test]
    fn test_apply_method_change_holds_previous_method() {
        let now = Utc::now();
        let mut acct = account(PaymentMethod::Drawdown);
        let plan = plan_method_change(&acct, None, PaymentMethod::Pad, 3, now).unwrap();

        apply_method_change(&mut acct, &plan);
        assert_eq!(acct.payment_method, PaymentMethod::Pad);
        assert_eq!(acct.effective_payment_method(now), PaymentMethod::Drawdown);
    }
}
