//! Account domain errors

use thiserror::Error;

/// Errors that can occur in the account domain
#[derive(Debug, Error)]
pub enum AccountError {
    /// Status transition not allowed by the CFS account state machine
    #[error("Invalid CFS account transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Payment-method change not supported
    #[error("Unsupported payment method transition: {from} -> {to}")]
    UnsupportedMethodChange { from: String, to: String },

    /// Account deletion refused while credit remains
    #[error("Account {0} has an outstanding credit balance")]
    CreditBalanceOutstanding(String),

    /// Account deletion refused while frozen
    #[error("Account {0} is frozen")]
    AccountFrozen(String),

    /// Account deletion refused while transactions are unsettled
    #[error("Account {0} has {1} unsettled transactions in the lookback window")]
    OutstandingTransactions(String, usize),

    /// Credit mutation would overdraw the balance
    #[error("Credit balance on account {0} cannot go negative")]
    CreditOverdrawn(String),

    /// Request failed field validation
    #[error("Validation failed: {0}")]
    Validation(String),
}
