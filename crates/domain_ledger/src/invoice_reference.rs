//! Fiscal-system invoice references
//!
//! Binds an invoice to the invoice number the fiscal system knows it by.
//! Several invoices can share one number when a batch job consolidates
//! them into a single fiscal invoice. Exactly one row per invoice number
//! is effective (ACTIVE or COMPLETED) at a time; superseded rows stay as
//! CANCELLED history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, InvoiceReferenceId};

use crate::error::LedgerError;

/// Invoice reference status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceReferenceStatus {
    /// Current reference for an unsettled invoice
    Active,
    /// Money received against this reference
    Completed,
    /// Reversed or replaced by a consolidated invoice
    Cancelled,
}

/// The external invoice number/reference pair bound to an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceReference {
    pub id: InvoiceReferenceId,
    pub invoice_id: InvoiceId,
    /// The number the fiscal system files the invoice under
    pub invoice_number: String,
    /// The fiscal system's own reference identifier, when returned
    pub reference_number: Option<String>,
    pub status: InvoiceReferenceStatus,
    pub created_at: DateTime<Utc>,
}

impl InvoiceReference {
    /// Creates an ACTIVE reference
    pub fn new(invoice_id: InvoiceId, invoice_number: impl Into<String>) -> Self {
        Self {
            id: InvoiceReferenceId::new_v7(),
            invoice_id,
            invoice_number: invoice_number.into(),
            reference_number: None,
            status: InvoiceReferenceStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Attaches the fiscal system's reference identifier
    pub fn with_reference_number(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = Some(reference.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == InvoiceReferenceStatus::Active
    }

    /// Flips ACTIVE to COMPLETED when money is received
    pub fn complete(&mut self) -> Result<(), LedgerError> {
        if self.status != InvoiceReferenceStatus::Active {
            return Err(LedgerError::InvalidOperation(format!(
                "cannot complete invoice reference in status {:?}",
                self.status
            )));
        }
        self.status = InvoiceReferenceStatus::Completed;
        Ok(())
    }

    /// Cancels the reference when reversed or superseded
    pub fn cancel(&mut self) {
        self.status = InvoiceReferenceStatus::Cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reference_is_active() {
        let reference = InvoiceReference::new(InvoiceId::new(), "REG01234");
        assert!(reference.is_active());
        assert_eq!(reference.invoice_number, "REG01234");
    }

    #[test]
    fn test_complete_only_from_active() {
        let mut reference = InvoiceReference::new(InvoiceId::new(), "REG01234");
        reference.complete().unwrap();
        assert_eq!(reference.status, InvoiceReferenceStatus::Completed);
        assert!(reference.complete().is_err());
    }

    #[test]
    fn test_cancel_keeps_history_row() {
        let mut reference = InvoiceReference::new(InvoiceId::new(), "REG01234");
        reference.cancel();
        assert_eq!(reference.status, InvoiceReferenceStatus::Cancelled);
    }
}
