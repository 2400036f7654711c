//! Electronic journal voucher artifacts
//!
//! A generated JV file moves partner shares between ministries without a
//! bank transaction. The File -> Header -> Link hierarchy mirrors the
//! upload format: one header per GL batch, one link per invoice or
//! partial-refund row. Every level carries its own disbursement status so
//! a confirmation pass can advance the chain without re-reading the file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DisbursementId, EjvFileId, EjvHeaderId, EjvLinkId, InvoiceId, Money, RefundLineId};
use domain_ledger::DisbursementStatus;

use crate::error::DistributionError;

/// A generated journal-voucher file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EjvFile {
    pub id: EjvFileId,
    pub file_ref: String,
    pub status: DisbursementStatus,
    pub created_at: DateTime<Utc>,
}

impl EjvFile {
    pub fn new(file_ref: impl Into<String>) -> Self {
        Self {
            id: EjvFileId::new_v7(),
            file_ref: file_ref.into(),
            status: DisbursementStatus::WaitingForJob,
            created_at: Utc::now(),
        }
    }
}

/// One GL batch inside a file, grouped by batch type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EjvHeader {
    pub id: EjvHeaderId,
    pub file_id: EjvFileId,
    /// Batch grouping key derived from corp type and GL client
    pub batch_type: String,
    pub status: DisbursementStatus,
    pub total: Money,
}

impl EjvHeader {
    pub fn new(file_id: EjvFileId, batch_type: impl Into<String>, total: Money) -> Self {
        Self {
            id: EjvHeaderId::new_v7(),
            file_id,
            batch_type: batch_type.into(),
            status: DisbursementStatus::WaitingForJob,
            total,
        }
    }
}

/// What a JV link disburses: an invoice's partner share or a partial
/// refund's reversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum EjvLinkTarget {
    Invoice(InvoiceId),
    PartialRefund(RefundLineId),
}

/// One disbursed row inside a header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EjvLink {
    pub id: EjvLinkId,
    pub header_id: EjvHeaderId,
    pub target: EjvLinkTarget,
    pub amount: Money,
    pub status: DisbursementStatus,
}

impl EjvLink {
    pub fn new(header_id: EjvHeaderId, target: EjvLinkTarget, amount: Money) -> Self {
        Self {
            id: EjvLinkId::new_v7(),
            header_id,
            target,
            amount,
            status: DisbursementStatus::WaitingForJob,
        }
    }
}

/// One partner's pending or completed disbursement for an invoice
///
/// Reversals get their own row rather than mutating the original; the
/// `is_reversal` flag distinguishes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerDisbursement {
    pub id: DisbursementId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub is_reversal: bool,
    pub status: DisbursementStatus,
    /// Reference of the JV file this row was uploaded in
    pub file_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_on: Option<DateTime<Utc>>,
}

impl PartnerDisbursement {
    pub fn new(invoice_id: InvoiceId, amount: Money, is_reversal: bool) -> Self {
        Self {
            id: DisbursementId::new_v7(),
            invoice_id,
            amount,
            is_reversal,
            status: DisbursementStatus::WaitingForJob,
            file_ref: None,
            created_at: Utc::now(),
            processed_on: None,
        }
    }

    /// Records the row's inclusion in an uploaded JV file
    pub fn mark_uploaded(&mut self, file_ref: &str, at: DateTime<Utc>) -> Result<(), DistributionError> {
        self.advance(DisbursementStatus::WaitingForJob, DisbursementStatus::Uploaded)?;
        self.file_ref = Some(file_ref.to_string());
        self.processed_on = Some(at);
        Ok(())
    }

    /// Records fiscal-side confirmation of the batch
    pub fn mark_completed(&mut self) -> Result<(), DistributionError> {
        self.advance(DisbursementStatus::Uploaded, DisbursementStatus::Completed)
    }

    pub fn cancel(&mut self) -> Result<(), DistributionError> {
        self.advance(DisbursementStatus::WaitingForJob, DisbursementStatus::Cancelled)
    }

    fn advance(
        &mut self,
        expected: DisbursementStatus,
        to: DisbursementStatus,
    ) -> Result<(), DistributionError> {
        if self.status != expected {
            return Err(DistributionError::InvalidSegment {
                segment: "disbursement_status".to_string(),
                message: format!("expected {:?}, found {:?}", expected, self.status),
            });
        }
        self.status = to;
        Ok(())
    }
}
