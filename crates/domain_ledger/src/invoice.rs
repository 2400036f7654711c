//! Invoice entity and lifecycle state machine
//!
//! The invoice status is an explicit finite-state machine: every mutation
//! goes through [`Invoice::transition_to`], which rejects transitions the
//! table does not allow. Call sites never assign the status field directly.
//!
//! # Lifecycle
//!
//! ```text
//! CREATED -> APPROVED -> (PAID | SETTLEMENT_SCHEDULED | OVERDUE)
//!                     -> REFUND_REQUESTED -> (REFUNDED | CREDITED)
//! ```
//!
//! plus the distribution-code recovery statuses (UPDATE_REVENUE_ACCOUNT*),
//! the EFT partial-application status (PARTIAL), and the terminal
//! CANCELLED / DELETED / DELETE_ACCEPTED handling.
//!
//! # Invariants
//!
//! - `paid <= total` except during a commit race; the overpaid state is
//!   observable via [`Invoice::is_overpaid`] and never silently corrected
//! - an invoice reverted by NSF goes back to CREATED so the reconciliation
//!   job can re-invoice it once the block clears

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, InvoiceId, Money};

use crate::codes::{CorpType, DisbursementStatus, PaymentMethod};
use crate::error::LedgerError;
use crate::line_item::PaymentLineItem;

/// Invoice status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Raised, settlement not yet arranged
    Created,
    /// Settlement deferred to a batch job (PAD, EJV, balance-backed internal)
    Approved,
    /// Fiscal invoice generated, waiting for money
    SettlementScheduled,
    /// Fully settled
    Paid,
    /// Partially covered by EFT credit
    Partial,
    /// Past its statement due date without payment
    Overdue,
    /// Refund initiated, awaiting GL confirmation
    RefundRequested,
    /// Refund posted by the fiscal system
    Refunded,
    /// Refund settled as a credit memo on the account
    Credited,
    /// Distribution code changed before payment posted; GL must be re-posted
    UpdateRevenueAccount,
    /// Distribution code changed before refund posted; GL must be re-posted
    UpdateRevenueAccountRefund,
    /// Deleted before completion
    Cancelled,
    /// Removed by the owning product before settlement
    Deleted,
    /// Deletion requested, awaiting fiscal-side reversal
    DeleteAccepted,
}

impl InvoiceStatus {
    /// Returns true if no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Refunded
                | InvoiceStatus::Credited
                | InvoiceStatus::Cancelled
                | InvoiceStatus::Deleted
        )
    }

    /// The allowed transition table
    ///
    /// `Paid -> Created` is deliberate: a routing-slip NSF reversal returns
    /// the invoice to the re-invoiceable pool.
    pub fn can_transition_to(&self, to: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        match (self, to) {
            (Created, Approved)
            | (Created, SettlementScheduled)
            | (Created, Paid)
            | (Created, Partial)
            | (Created, Cancelled)
            | (Created, Deleted)
            | (Created, DeleteAccepted)
            | (Approved, SettlementScheduled)
            | (Approved, Paid)
            | (Approved, Partial)
            | (Approved, Overdue)
            | (Approved, UpdateRevenueAccount)
            | (Approved, Cancelled)
            | (Approved, DeleteAccepted)
            | (SettlementScheduled, Paid)
            | (SettlementScheduled, Partial)
            | (SettlementScheduled, Cancelled)
            | (Overdue, SettlementScheduled)
            | (Overdue, Paid)
            | (Overdue, Partial)
            | (Partial, Paid)
            | (Partial, RefundRequested)
            | (Paid, Created)
            | (Paid, RefundRequested)
            | (Paid, Credited)
            | (RefundRequested, Refunded)
            | (RefundRequested, Credited)
            | (RefundRequested, Paid)
            | (RefundRequested, UpdateRevenueAccountRefund)
            | (UpdateRevenueAccount, Paid)
            | (UpdateRevenueAccount, Approved)
            | (UpdateRevenueAccountRefund, Refunded)
            | (DeleteAccepted, Deleted)
            | (DeleteAccepted, Cancelled) => true,
            _ => false,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            InvoiceStatus::Created => "CREATED",
            InvoiceStatus::Approved => "APPROVED",
            InvoiceStatus::SettlementScheduled => "SETTLEMENT_SCHED",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Partial => "PARTIAL",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::RefundRequested => "REFUND_REQUESTED",
            InvoiceStatus::Refunded => "REFUNDED",
            InvoiceStatus::Credited => "CREDITED",
            InvoiceStatus::UpdateRevenueAccount => "GL_UPDATED",
            InvoiceStatus::UpdateRevenueAccountRefund => "GL_UPDATED_REFUND",
            InvoiceStatus::Cancelled => "CANCELLED",
            InvoiceStatus::Deleted => "DELETED",
            InvoiceStatus::DeleteAccepted => "DELETE_ACCEPTED",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One billable transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Owning payment account
    pub account_id: AccountId,
    /// Current status
    pub status: InvoiceStatus,
    /// Settlement channel chosen at creation time
    pub payment_method: PaymentMethod,
    /// Product line that raised the invoice
    pub corp_type: CorpType,
    /// External business identifier (e.g. entity number)
    pub business_identifier: Option<String>,
    /// Customer-supplied folio number
    pub folio_number: Option<String>,
    /// Invoice total including fees and tax
    pub total: Money,
    /// Amount settled so far
    pub paid: Money,
    /// Service fees portion of the total
    pub service_fees: Money,
    /// GST portion of the total
    pub gst: Money,
    /// Amount refunded so far
    pub refund: Money,
    /// Routing slip number when settled against pooled cash
    pub routing_slip_number: Option<String>,
    /// Partner disbursement progress
    pub disbursement_status: Option<DisbursementStatus>,
    /// When the statement engine declared the invoice overdue
    pub overdue_date: Option<NaiveDate>,
    /// When payment completed
    pub payment_date: Option<DateTime<Utc>>,
    /// When the refund posted
    pub refund_date: Option<DateTime<Utc>>,
    /// Line items making up the total
    pub line_items: Vec<PaymentLineItem>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a new invoice in the status the payment method starts in
    ///
    /// Deferred methods (PAD, EJV, balance-backed internal) start APPROVED;
    /// everything else starts CREATED and settles within the request flow.
    pub fn new(
        account_id: AccountId,
        payment_method: PaymentMethod,
        corp_type: CorpType,
        total: Money,
        service_fees: Money,
        gst: Money,
    ) -> Self {
        let now = Utc::now();
        let currency = total.currency();
        let status = if matches!(
            payment_method,
            PaymentMethod::Pad | PaymentMethod::Ejv | PaymentMethod::Eft
        ) {
            InvoiceStatus::Approved
        } else {
            InvoiceStatus::Created
        };

        Self {
            id: InvoiceId::new_v7(),
            account_id,
            status,
            payment_method,
            corp_type,
            business_identifier: None,
            folio_number: None,
            total,
            paid: Money::zero(currency),
            service_fees,
            gst,
            refund: Money::zero(currency),
            routing_slip_number: None,
            disbursement_status: None,
            overdue_date: None,
            payment_date: None,
            refund_date: None,
            line_items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the business identifier
    pub fn with_business_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.business_identifier = Some(identifier.into());
        self
    }

    /// Sets the folio number
    pub fn with_folio(mut self, folio: impl Into<String>) -> Self {
        self.folio_number = Some(folio.into());
        self
    }

    /// Adds a line item
    pub fn add_line_item(&mut self, item: PaymentLineItem) {
        self.line_items.push(item);
    }

    /// The unsettled balance (`total - paid`)
    pub fn balance(&self) -> Money {
        self.total - self.paid
    }

    /// True when a commit race left `paid` above `total`
    pub fn is_overpaid(&self) -> bool {
        self.paid > self.total
    }

    /// Validated status transition
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidTransition`] when the state machine
    /// does not allow the move.
    pub fn transition_to(&mut self, to: InvoiceStatus) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(to) {
            return Err(LedgerError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records settlement of the full outstanding balance
    pub fn mark_paid(&mut self, payment_date: DateTime<Utc>) -> Result<(), LedgerError> {
        self.paid = self.total;
        self.payment_date = Some(payment_date);
        self.transition_to(InvoiceStatus::Paid)
    }

    /// Records a refund posting and the resulting status
    pub fn mark_refunded(
        &mut self,
        refund_amount: Money,
        refund_date: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.refund = refund_amount;
        self.refund_date = Some(refund_date);
        self.transition_to(InvoiceStatus::Refunded)
    }

    /// Reverts a paid invoice to CREATED after an NSF reversal
    ///
    /// Clears payment facts so the invoice re-enters the reconciliation
    /// pool; the caller removes receipts and recreates the reference.
    pub fn revert_for_nsf(&mut self) -> Result<(), LedgerError> {
        self.transition_to(InvoiceStatus::Created)?;
        self.paid = Money::zero(self.total.currency());
        self.payment_date = None;
        Ok(())
    }

    /// True once the invoice has settled and the disbursement cooldown may
    /// begin counting
    pub fn is_settled(&self) -> bool {
        matches!(self.status, InvoiceStatus::Paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn invoice(method: PaymentMethod) -> Invoice {
        Invoice::new(
            AccountId::new(),
            method,
            CorpType::new("CP"),
            Money::cad(dec!(100.00)),
            Money::cad(dec!(1.50)),
            Money::cad(dec!(0)),
        )
    }

    #[test]
    fn test_default_status_by_method() {
        assert_eq!(invoice(PaymentMethod::Pad).status, InvoiceStatus::Approved);
        assert_eq!(invoice(PaymentMethod::Ejv).status, InvoiceStatus::Approved);
        assert_eq!(invoice(PaymentMethod::Eft).status, InvoiceStatus::Approved);
        assert_eq!(invoice(PaymentMethod::DirectPay).status, InvoiceStatus::Created);
        assert_eq!(invoice(PaymentMethod::OnlineBanking).status, InvoiceStatus::Created);
    }

    #[test]
    fn test_legal_settlement_path() {
        let mut inv = invoice(PaymentMethod::Pad);
        inv.transition_to(InvoiceStatus::SettlementScheduled).unwrap();
        inv.mark_paid(Utc::now()).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert!(inv.balance().is_zero());
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut inv = invoice(PaymentMethod::Pad);
        let err = inv.transition_to(InvoiceStatus::Refunded).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        assert_eq!(inv.status, InvoiceStatus::Approved);
    }

    #[test]
    fn test_terminal_states_stay_terminal() {
        let mut inv = invoice(PaymentMethod::DirectPay);
        inv.transition_to(InvoiceStatus::Cancelled).unwrap();
        assert!(inv.status.is_terminal());
        assert!(inv.transition_to(InvoiceStatus::Approved).is_err());
    }

    #[test]
    fn test_refund_request_to_credited() {
        let mut inv = invoice(PaymentMethod::Pad);
        inv.transition_to(InvoiceStatus::SettlementScheduled).unwrap();
        inv.mark_paid(Utc::now()).unwrap();
        inv.transition_to(InvoiceStatus::RefundRequested).unwrap();
        inv.transition_to(InvoiceStatus::Credited).unwrap();
        assert!(inv.status.is_terminal());
    }

    #[test]
    fn test_nsf_revert_clears_payment_facts() {
        let mut inv = invoice(PaymentMethod::Internal);
        inv.mark_paid(Utc::now()).unwrap();
        inv.revert_for_nsf().unwrap();

        assert_eq!(inv.status, InvoiceStatus::Created);
        assert!(inv.paid.is_zero());
        assert!(inv.payment_date.is_none());
    }

    #[test]
    fn test_overpaid_is_flagged_not_corrected() {
        let mut inv = invoice(PaymentMethod::Eft);
        inv.paid = Money::cad(dec!(150.00));
        assert!(inv.is_overpaid());
        assert_eq!(inv.paid.amount(), dec!(150.00));
    }

    #[test]
    fn test_distribution_change_recovery_path() {
        let mut inv = invoice(PaymentMethod::Pad);
        inv.transition_to(InvoiceStatus::UpdateRevenueAccount).unwrap();
        inv.transition_to(InvoiceStatus::Approved).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Approved);
    }
}
