//! Receipts - proof of funds applied to an invoice

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, Money, ReceiptId};

/// Proof of funds applied to an invoice
///
/// One invoice can carry several receipts when a method splits settlement
/// (EFT applying more than one credit). Receipts are deleted and recreated
/// on reversal rather than edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub invoice_id: InvoiceId,
    pub receipt_number: String,
    pub receipt_amount: Money,
    pub receipt_date: DateTime<Utc>,
}

impl Receipt {
    pub fn new(
        invoice_id: InvoiceId,
        receipt_number: impl Into<String>,
        receipt_amount: Money,
        receipt_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReceiptId::new_v7(),
            invoice_id,
            receipt_number: receipt_number.into(),
            receipt_amount,
            receipt_date,
        }
    }
}
