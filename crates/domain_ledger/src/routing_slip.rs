//! Routing slips - pooled cash/cheque funds
//!
//! A routing slip holds deposited funds drawn down by invoices. Slips can
//! be linked parent/child to pool funds: linking moves the child's
//! remaining balance onto the parent and freezes the child. An NSF'd slip
//! keeps a (possibly negative) running balance so the shortfall and the
//! NSF fee stay visible until cleared.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, Money, RoutingSlipId};

use crate::error::LedgerError;

/// Routing slip status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingSlipStatus {
    /// Funds available for drawdown
    Active,
    /// Cheque bounced; balance may be negative until restored
    Nsf,
    /// Linked to a parent slip; funds moved to the parent
    Linked,
    /// Fully drawn down
    Complete,
    /// Remaining funds approved for refund to the depositor
    RefundAuthorized,
    /// Refund included in an AP disbursement file
    RefundUploaded,
    /// Voided before any drawdown
    Void,
}

/// A cash/cheque pooled-funds record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSlip {
    pub id: RoutingSlipId,
    /// Human-entered slip number, unique across the ledger
    pub number: String,
    /// Account the slip settles invoices for, once assigned
    pub account_id: Option<AccountId>,
    pub status: RoutingSlipStatus,
    /// Funds originally deposited
    pub total: Money,
    /// Funds still available; negative after an NSF clawback
    pub remaining_amount: Money,
    /// Parent slip number when this slip's funds were pooled
    pub parent_number: Option<String>,
    pub routing_slip_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl RoutingSlip {
    pub fn new(number: impl Into<String>, total: Money, routing_slip_date: NaiveDate) -> Self {
        Self {
            id: RoutingSlipId::new_v7(),
            number: number.into(),
            account_id: None,
            status: RoutingSlipStatus::Active,
            total,
            remaining_amount: total,
            parent_number: None,
            routing_slip_date,
            created_at: Utc::now(),
        }
    }

    pub fn for_account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// True when the slip can cover the given amount
    pub fn has_balance_for(&self, amount: Money) -> bool {
        self.status == RoutingSlipStatus::Active && self.remaining_amount >= amount
    }

    /// Links this slip under a parent, pooling the funds
    ///
    /// Both slips must be ACTIVE, neither may already participate in a
    /// link, and a slip cannot be its own parent.
    pub fn link_to(&mut self, parent: &mut RoutingSlip) -> Result<(), LedgerError> {
        if self.number == parent.number {
            return Err(LedgerError::SlipLinking(
                "cannot link a routing slip to itself".to_string(),
            ));
        }
        if self.status != RoutingSlipStatus::Active {
            return Err(LedgerError::SlipLinking(format!(
                "child slip {} is not active",
                self.number
            )));
        }
        if parent.status != RoutingSlipStatus::Active {
            return Err(LedgerError::SlipLinking(format!(
                "parent slip {} is not active",
                parent.number
            )));
        }
        if self.parent_number.is_some() {
            return Err(LedgerError::SlipLinking(format!(
                "slip {} is already linked",
                self.number
            )));
        }
        if parent.parent_number.is_some() {
            return Err(LedgerError::SlipLinking(format!(
                "parent slip {} is itself a child",
                parent.number
            )));
        }

        parent.remaining_amount = parent.remaining_amount.checked_add(&self.remaining_amount)?;
        self.remaining_amount = Money::zero(self.total.currency());
        self.parent_number = Some(parent.number.clone());
        self.status = RoutingSlipStatus::Linked;
        Ok(())
    }

    /// Draws the amount down from the slip's balance
    ///
    /// Completes the slip when the balance reaches zero.
    pub fn apply_payment(&mut self, amount: Money) -> Result<(), LedgerError> {
        if !self.has_balance_for(amount) {
            return Err(LedgerError::InvalidOperation(format!(
                "routing slip {} cannot cover {}",
                self.number, amount
            )));
        }
        self.remaining_amount = self.remaining_amount.checked_sub(&amount)?;
        if self.remaining_amount.is_zero() {
            self.status = RoutingSlipStatus::Complete;
        }
        Ok(())
    }

    /// Marks the slip NSF after the bank bounced the deposit, clawing the
    /// bounced amount back from the balance
    pub fn mark_nsf(&mut self, bounced_amount: Money) -> Result<(), LedgerError> {
        if matches!(self.status, RoutingSlipStatus::Linked | RoutingSlipStatus::Void) {
            return Err(LedgerError::InvalidOperation(format!(
                "cannot NSF routing slip {} in status {:?}",
                self.number, self.status
            )));
        }
        self.remaining_amount = self.remaining_amount.checked_sub(&bounced_amount)?;
        self.status = RoutingSlipStatus::Nsf;
        Ok(())
    }

    /// Debits the NSF processing fee; the balance may go further negative
    pub fn apply_nsf_fee(&mut self, fee: Money) -> Result<(), LedgerError> {
        if self.status != RoutingSlipStatus::Nsf {
            return Err(LedgerError::InvalidOperation(format!(
                "NSF fee requires NSF status on slip {}",
                self.number
            )));
        }
        self.remaining_amount = self.remaining_amount.checked_sub(&fee)?;
        Ok(())
    }

    /// Authorizes refund of the remaining balance to the depositor
    pub fn authorize_refund(&mut self) -> Result<(), LedgerError> {
        if self.status != RoutingSlipStatus::Active || !self.remaining_amount.is_positive() {
            return Err(LedgerError::InvalidOperation(format!(
                "slip {} has no refundable balance",
                self.number
            )));
        }
        self.status = RoutingSlipStatus::RefundAuthorized;
        Ok(())
    }

    /// Records inclusion in an AP disbursement file
    pub fn mark_refund_uploaded(&mut self) -> Result<(), LedgerError> {
        if self.status != RoutingSlipStatus::RefundAuthorized {
            return Err(LedgerError::InvalidOperation(format!(
                "slip {} refund was not authorized",
                self.number
            )));
        }
        self.status = RoutingSlipStatus::RefundUploaded;
        Ok(())
    }
}
