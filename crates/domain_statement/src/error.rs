//! Statement domain errors

use thiserror::Error;

/// Errors that can occur in the statement domain
#[derive(Debug, Error)]
pub enum StatementError {
    #[error("Settings already closed for account {0}")]
    SettingsClosed(String),

    #[error("Invalid statement period: {0}")]
    InvalidPeriod(String),

    #[error("No statement settings for account {0}")]
    NoSettings(String),
}
