//! Ledger domain errors

use core_kernel::MoneyError;
use thiserror::Error;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Status transition not allowed by the invoice state machine
    #[error("Invalid invoice transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Refund line exceeds its fee-type ceiling
    #[error("Refund amount {amount} exceeds {refund_type} ceiling {ceiling} on line {line}")]
    RefundExceedsCeiling {
        line: String,
        refund_type: String,
        amount: rust_decimal::Decimal,
        ceiling: rust_decimal::Decimal,
    },

    /// Refund amount is negative
    #[error("Refund amount must not be negative on line {0}")]
    NegativeRefund(String),

    /// Refund path not available for this payment method or fee type
    #[error("Refund not allowed: {0}")]
    RefundNotAllowed(String),

    /// Total of partial refund lines exceeds the invoice total
    #[error("Partial refunds {requested} exceed invoice total {total}")]
    RefundExceedsInvoice {
        requested: rust_decimal::Decimal,
        total: rust_decimal::Decimal,
    },

    /// Credit consumption would exceed the remaining amount
    #[error("Credit {0} has insufficient remaining amount")]
    CreditExhausted(String),

    /// Routing slip linking rule violated
    #[error("Routing slip link rejected: {0}")]
    SlipLinking(String),

    /// Calculation error
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
