//! Payment records
//!
//! One money-movement row tied to an invoice *number* rather than an
//! invoice id, so several consolidated invoices can settle under a single
//! payment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, Money, PaymentId};

use crate::codes::{PaymentMethod, PaymentSystem};

/// Payment status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Created,
    Completed,
    Failed,
    Deleted,
    Refunded,
}

/// A money-movement record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub account_id: AccountId,
    pub payment_method: PaymentMethod,
    pub payment_system: PaymentSystem,
    pub status: PaymentStatus,
    /// Fiscal invoice number this payment settles (possibly consolidated)
    pub invoice_number: String,
    /// Total of the invoice(s) under the number
    pub invoice_amount: Money,
    /// Amount actually received
    pub paid_amount: Money,
    pub receipt_number: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        account_id: AccountId,
        payment_method: PaymentMethod,
        payment_system: PaymentSystem,
        invoice_number: impl Into<String>,
        invoice_amount: Money,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            account_id,
            payment_method,
            payment_system,
            status: PaymentStatus::Created,
            invoice_number: invoice_number.into(),
            invoice_amount,
            paid_amount: Money::zero(invoice_amount.currency()),
            receipt_number: None,
            payment_date: None,
            created_at: Utc::now(),
        }
    }

    /// Creates an already-completed payment, used when money arrived before
    /// the ledger row (EFT credit application, routing-slip settlement)
    pub fn completed(
        account_id: AccountId,
        payment_method: PaymentMethod,
        payment_system: PaymentSystem,
        invoice_number: impl Into<String>,
        invoice_amount: Money,
        paid_amount: Money,
        payment_date: DateTime<Utc>,
    ) -> Self {
        let mut payment = Self::new(
            account_id,
            payment_method,
            payment_system,
            invoice_number,
            invoice_amount,
        );
        payment.status = PaymentStatus::Completed;
        payment.paid_amount = paid_amount;
        payment.payment_date = Some(payment_date);
        payment
    }

    pub fn with_receipt_number(mut self, receipt: impl Into<String>) -> Self {
        self.receipt_number = Some(receipt.into());
        self
    }

    /// Marks the payment as settled
    pub fn complete(&mut self, paid_amount: Money, payment_date: DateTime<Utc>) {
        self.status = PaymentStatus::Completed;
        self.paid_amount = paid_amount;
        self.payment_date = Some(payment_date);
    }

    /// Marks the payment as failed (NSF and gateway declines)
    pub fn fail(&mut self) {
        self.status = PaymentStatus::Failed;
    }

    /// Marks the payment as refunded after GL confirmation
    pub fn mark_refunded(&mut self) {
        self.status = PaymentStatus::Refunded;
    }
}
