//! Fiscal-system account rows
//!
//! A [`CfsAccount`] binds a payment account + payment method to the fiscal
//! system's customer/party/site triple. Rows are append-only: changing bank
//! details never edits a row in place - the old row goes INACTIVE and a new
//! PENDING row is provisioned. At most one row per (account, method) is
//! *effective* (any status except INACTIVE) at a time; the store enforces
//! that uniqueness, this module enforces the legal status moves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CfsAccountId};
use domain_ledger::PaymentMethod;

use crate::error::AccountError;

/// CFS account status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CfsAccountStatus {
    /// Waiting for the account-creation job to provision the fiscal profile
    Pending,
    /// Fiscal profile exists; PAD confirmation period still running
    PendingPadActivation,
    /// Usable for invoicing
    Active,
    /// Locked by NSF or overdue handling
    Freeze,
    /// Superseded or abandoned; kept as history
    Inactive,
}

impl CfsAccountStatus {
    /// The allowed transition table
    pub fn can_transition_to(&self, to: CfsAccountStatus) -> bool {
        use CfsAccountStatus::*;
        matches!(
            (self, to),
            (Pending, Active)
                | (Pending, PendingPadActivation)
                | (Pending, Inactive)
                | (PendingPadActivation, Active)
                | (PendingPadActivation, Inactive)
                | (Active, Freeze)
                | (Active, Inactive)
                | (Freeze, Active)
                | (Freeze, Inactive)
        )
    }

    /// Effective rows are every status except INACTIVE
    pub fn is_effective(&self) -> bool {
        !matches!(self, CfsAccountStatus::Inactive)
    }
}

impl std::fmt::Display for CfsAccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            CfsAccountStatus::Pending => "PENDING",
            CfsAccountStatus::PendingPadActivation => "PENDING_PAD_ACTIVATION",
            CfsAccountStatus::Active => "ACTIVE",
            CfsAccountStatus::Freeze => "FREEZE",
            CfsAccountStatus::Inactive => "INACTIVE",
        };
        write!(f, "{}", code)
    }
}

/// PAD bank details carried by a CFS account row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_number: String,
    pub branch_number: String,
    pub account_number: String,
}

/// The fiscal-system account/party/site triple for one payment method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfsAccount {
    pub id: CfsAccountId,
    pub account_id: AccountId,
    pub payment_method: PaymentMethod,
    pub status: CfsAccountStatus,
    /// Fiscal identifiers, populated by the account-creation job
    pub cfs_account: Option<String>,
    pub cfs_party: Option<String>,
    pub cfs_site: Option<String>,
    /// Present only for PAD
    pub bank_details: Option<BankDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CfsAccount {
    /// Creates a PENDING row awaiting fiscal provisioning
    pub fn pending(account_id: AccountId, payment_method: PaymentMethod) -> Self {
        let now = Utc::now();
        Self {
            id: CfsAccountId::new_v7(),
            account_id,
            payment_method,
            status: CfsAccountStatus::Pending,
            cfs_account: None,
            cfs_party: None,
            cfs_site: None,
            bank_details: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_bank_details(mut self, details: BankDetails) -> Self {
        self.bank_details = Some(details);
        self
    }

    /// Validated status transition
    pub fn transition_to(&mut self, to: CfsAccountStatus) -> Result<(), AccountError> {
        if !self.status.can_transition_to(to) {
            return Err(AccountError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records the provisioned fiscal identifiers and advances the status
    ///
    /// PAD rows wait out the confirmation period in
    /// PENDING_PAD_ACTIVATION; every other method goes straight to ACTIVE.
    pub fn provisioned(
        &mut self,
        cfs_account: impl Into<String>,
        cfs_party: impl Into<String>,
        cfs_site: impl Into<String>,
    ) -> Result<(), AccountError> {
        self.cfs_account = Some(cfs_account.into());
        self.cfs_party = Some(cfs_party.into());
        self.cfs_site = Some(cfs_site.into());
        let next = if self.payment_method == PaymentMethod::Pad {
            CfsAccountStatus::PendingPadActivation
        } else {
            CfsAccountStatus::Active
        };
        self.transition_to(next)
    }

    /// True when the row blocks creation of another effective row
    pub fn is_effective(&self) -> bool {
        self.status.is_effective()
    }

    /// Marks the row superseded (bank change, abandoned provisioning)
    pub fn deactivate(&mut self) -> Result<(), AccountError> {
        self.transition_to(CfsAccountStatus::Inactive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> BankDetails {
        BankDetails {
            bank_number: "0001".to_string(),
            branch_number: "00720".to_string(),
            account_number: "1234567".to_string(),
        }
    }

    #[test]
    fn test_pad_provisioning_waits_for_activation() {
        let mut cfs = CfsAccount::pending(AccountId::new(), PaymentMethod::Pad)
            .with_bank_details(bank());
        cfs.provisioned("11111", "22222", "33333").unwrap();
        assert_eq!(cfs.status, CfsAccountStatus::PendingPadActivation);

        cfs.transition_to(CfsAccountStatus::Active).unwrap();
        assert_eq!(cfs.status, CfsAccountStatus::Active);
    }

    #[test]
    fn test_online_banking_provisioning_activates_directly() {
        let mut cfs = CfsAccount::pending(AccountId::new(), PaymentMethod::OnlineBanking);
        cfs.provisioned("11111", "22222", "33333").unwrap();
        assert_eq!(cfs.status, CfsAccountStatus::Active);
    }

    #[test]
    fn test_freeze_and_unfreeze() {
        let mut cfs = CfsAccount::pending(AccountId::new(), PaymentMethod::Pad);
        cfs.transition_to(CfsAccountStatus::PendingPadActivation).unwrap();
        cfs.transition_to(CfsAccountStatus::Active).unwrap();
        cfs.transition_to(CfsAccountStatus::Freeze).unwrap();
        cfs.transition_to(CfsAccountStatus::Active).unwrap();
    }

    #[test]
    fn test_inactive_is_terminal() {
        let mut cfs = CfsAccount::pending(AccountId::new(), PaymentMethod::Pad);
        cfs.deactivate().unwrap();
        assert!(!cfs.is_effective());
        assert!(cfs.transition_to(CfsAccountStatus::Active).is_err());
    }

    #[test]
    fn test_freeze_requires_active() {
        let mut cfs = CfsAccount::pending(AccountId::new(), PaymentMethod::Pad);
        assert!(cfs.transition_to(CfsAccountStatus::Freeze).is_err());
    }
}
