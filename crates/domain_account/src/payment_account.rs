//! Payment accounts
//!
//! The billing identity for an external auth account. Carries the stored
//! payment method, the aggregate credit balance, and the PAD activation
//! facts that determine the *effective* method exposed to invoicing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, Money};
use domain_ledger::PaymentMethod;

use crate::error::AccountError;

/// The billing identity for an external auth account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAccount {
    pub id: AccountId,
    /// The auth-system account this billing identity belongs to
    pub auth_account_id: String,
    pub name: String,
    /// Stored payment method; may be ahead of the effective method while a
    /// PAD confirmation period runs
    pub payment_method: PaymentMethod,
    /// Method still in force until PAD activation completes
    pub previous_payment_method: Option<PaymentMethod>,
    /// Aggregate credit balance across the account's Credit rows
    pub credit: Money,
    /// End of the PAD confirmation period, if one is running or has run
    pub pad_activation_date: Option<DateTime<Utc>>,
    /// True once PAD has completed activation at least once; re-entering
    /// PAD later does not restart the wait
    pub pad_activated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentAccount {
    pub fn new(
        auth_account_id: impl Into<String>,
        name: impl Into<String>,
        payment_method: PaymentMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new_v7(),
            auth_account_id: auth_account_id.into(),
            name: name.into(),
            payment_method,
            previous_payment_method: None,
            credit: Money::cad(rust_decimal::Decimal::ZERO),
            pad_activation_date: None,
            pad_activated: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// The payment method invoicing should use right now
    ///
    /// While a first-time PAD confirmation period runs, the stored method
    /// says PAD but settlement continues on the previous method.
    pub fn effective_payment_method(&self, now: DateTime<Utc>) -> PaymentMethod {
        if self.payment_method == PaymentMethod::Pad && !self.pad_activated {
            if let Some(activation) = self.pad_activation_date {
                if activation > now {
                    return self.previous_payment_method.unwrap_or(PaymentMethod::Pad);
                }
            }
        }
        self.payment_method
    }

    /// True while a PAD confirmation period is still running
    pub fn pad_activation_pending(&self, now: DateTime<Utc>) -> bool {
        self.payment_method == PaymentMethod::Pad
            && !self.pad_activated
            && self.pad_activation_date.map_or(false, |d| d > now)
    }

    /// Records completion of PAD activation
    pub fn complete_pad_activation(&mut self) {
        self.pad_activated = true;
        self.previous_payment_method = None;
        self.payment_method = PaymentMethod::Pad;
        self.updated_at = Utc::now();
    }

    /// Adds to the aggregate credit balance
    pub fn add_credit(&mut self, amount: Money) -> Result<(), AccountError> {
        self.credit = self
            .credit
            .checked_add(&amount)
            .map_err(|e| AccountError::Validation(e.to_string()))?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Deducts from the aggregate credit balance
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::CreditOverdrawn`] if the balance would go
    /// negative.
    pub fn deduct_credit(&mut self, amount: Money) -> Result<(), AccountError> {
        let next = self
            .credit
            .checked_sub(&amount)
            .map_err(|e| AccountError::Validation(e.to_string()))?;
        if next.is_negative() {
            return Err(AccountError::CreditOverdrawn(self.id.to_string()));
        }
        self.credit = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn has_credit(&self) -> bool {
        self.credit.is_positive()
    }
}
