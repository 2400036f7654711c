//! Refund requests and partial-refund validation
//!
//! Validation runs before any ledger mutation: a request that fails any
//! rule leaves the invoice, refund and line-item rows untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, LineItemId, Money, RefundId, RefundLineId};

use crate::codes::PaymentMethod;
use crate::error::LedgerError;
use crate::invoice::Invoice;

/// The fee component a partial-refund line draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundLineType {
    BaseFee,
    ServiceFee,
    PriorityFee,
    FutureEffectiveFee,
}

impl std::fmt::Display for RefundLineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            RefundLineType::BaseFee => "BASE_FEE",
            RefundLineType::ServiceFee => "SERVICE_FEE",
            RefundLineType::PriorityFee => "PRIORITY_FEE",
            RefundLineType::FutureEffectiveFee => "FUTURE_EFFECTIVE_FEE",
        };
        write!(f, "{}", code)
    }
}

/// One itemized partial-refund line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundPartialLine {
    pub id: RefundLineId,
    /// The invoice line item being partially refunded
    pub line_item_id: LineItemId,
    pub refund_type: RefundLineType,
    pub refund_amount: Money,
    /// Set by the confirmation job when the GL accepts the posting
    pub gl_posted: Option<DateTime<Utc>>,
    /// Set by the confirmation job when the GL rejects the posting
    pub gl_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RefundPartialLine {
    pub fn new(line_item_id: LineItemId, refund_type: RefundLineType, refund_amount: Money) -> Self {
        Self {
            id: RefundLineId::new_v7(),
            line_item_id,
            refund_type,
            refund_amount,
            gl_posted: None,
            gl_error: None,
            created_at: Utc::now(),
        }
    }
}

/// A refund request against an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: RefundId,
    pub invoice_id: InvoiceId,
    pub requested_by: String,
    pub reason: Option<String>,
    /// Total amount requested; equals the invoice total for full refunds
    pub amount: Money,
    /// Itemized lines; empty for a full refund
    pub partial_lines: Vec<RefundPartialLine>,
    pub gl_posted: Option<DateTime<Utc>>,
    pub gl_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Refund {
    /// Creates a full refund request
    pub fn full(invoice: &Invoice, requested_by: impl Into<String>) -> Self {
        Self {
            id: RefundId::new_v7(),
            invoice_id: invoice.id,
            requested_by: requested_by.into(),
            reason: None,
            amount: invoice.total,
            partial_lines: Vec::new(),
            gl_posted: None,
            gl_error: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a validated partial refund request
    ///
    /// # Errors
    ///
    /// Any ceiling or sign violation rejects the whole request before a
    /// refund row exists.
    pub fn partial(
        invoice: &Invoice,
        lines: Vec<RefundPartialLine>,
        requested_by: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let amount = validate_partial_refund(invoice, &lines)?;
        Ok(Self {
            id: RefundId::new_v7(),
            invoice_id: invoice.id,
            requested_by: requested_by.into(),
            reason: None,
            amount,
            partial_lines: lines,
            gl_posted: None,
            gl_error: None,
            created_at: Utc::now(),
        })
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_partial(&self) -> bool {
        !self.partial_lines.is_empty()
    }

    /// Records a GL rejection from the confirmation poll
    pub fn record_gl_error(&mut self, message: impl Into<String>) {
        self.gl_error = Some(message.into());
    }

    /// Records GL acceptance
    pub fn record_gl_posted(&mut self, at: DateTime<Utc>) {
        self.gl_posted = Some(at);
        self.gl_error = None;
    }
}

/// Validates partial-refund lines against the invoice and returns the
/// request total
///
/// Rules:
/// - every line amount satisfies `0 <= amount <= ceiling(line, type)`
/// - service fees are only refundable where the payment method supports
///   line-level gateway refunds (direct pay)
/// - the summed request does not exceed the invoice total
pub fn validate_partial_refund(
    invoice: &Invoice,
    lines: &[RefundPartialLine],
) -> Result<Money, LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::RefundNotAllowed(
            "partial refund requires at least one line".to_string(),
        ));
    }

    let mut requested = Money::zero(invoice.total.currency());

    for line in lines {
        if line.refund_amount.is_negative() {
            return Err(LedgerError::NegativeRefund(line.line_item_id.to_string()));
        }

        if line.refund_type == RefundLineType::ServiceFee
            && invoice.payment_method != PaymentMethod::DirectPay
        {
            return Err(LedgerError::RefundNotAllowed(format!(
                "service fees are not refundable for {}",
                invoice.payment_method
            )));
        }

        let item = invoice
            .line_items
            .iter()
            .find(|item| item.id == line.line_item_id)
            .ok_or_else(|| {
                LedgerError::InvalidOperation(format!(
                    "refund line references unknown line item {}",
                    line.line_item_id
                ))
            })?;

        let ceiling = item.refundable_ceiling(line.refund_type);
        if line.refund_amount > ceiling {
            return Err(LedgerError::RefundExceedsCeiling {
                line: line.line_item_id.to_string(),
                refund_type: line.refund_type.to_string(),
                amount: line.refund_amount.amount(),
                ceiling: ceiling.amount(),
            });
        }

        requested = requested.checked_add(&line.refund_amount)?;
    }

    if requested > invoice.total {
        return Err(LedgerError::RefundExceedsInvoice {
            requested: requested.amount(),
            total: invoice.total.amount(),
        });
    }

    Ok(requested)
}
