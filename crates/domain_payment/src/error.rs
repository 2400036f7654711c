//! Payment-layer errors and fiscal error classification

use core_kernel::PortError;
use domain_account::AccountError;
use domain_ledger::LedgerError;
use thiserror::Error;
use tracing::{error, warn};

/// Errors raised at the payment-system boundary
///
/// Low-level port failures never escape raw: they are classified here into
/// a typed business error carrying a stable code.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The account has unresolved NSF or overdue invoices; the caller must
    /// not retry until the block clears
    #[error("Payment blocked for account {account}: {reason}")]
    Blocked { account: String, reason: String },

    /// The fiscal system is down or unreachable; local state was left
    /// unchanged and the next scheduled run retries safely
    #[error("Fiscal system unavailable: {0}")]
    FiscalUnavailable(#[source] PortError),

    /// The fiscal system rejected the request for an account-specific
    /// business reason (e.g. an invalid bank account)
    #[error("Fiscal system rejected request [{code}]: {message}")]
    FiscalBusiness { code: String, message: String },

    /// A ledger invariant refused the operation
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// An account rule refused the operation
    #[error(transparent)]
    Account(#[from] AccountError),

    /// A store refused the read/write
    #[error(transparent)]
    Store(PortError),

    /// The operation makes no sense for this payment method
    #[error("Unsupported for {method}: {operation}")]
    Unsupported { method: String, operation: String },
}

impl PaymentError {
    /// Stable error code for API bodies and operator tooling
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::Blocked { .. } => "PAYMENT_BLOCKED",
            PaymentError::FiscalUnavailable(_) => "FISCAL_SYSTEM_DOWN",
            PaymentError::FiscalBusiness { .. } => "FISCAL_REJECTED",
            PaymentError::Ledger(_) => "LEDGER_RULE",
            PaymentError::Account(_) => "ACCOUNT_RULE",
            PaymentError::Store(_) => "STORE_FAILURE",
            PaymentError::Unsupported { .. } => "UNSUPPORTED_OPERATION",
        }
    }

    /// True when the next scheduled run may safely retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::FiscalUnavailable(_))
            || matches!(self, PaymentError::Store(e) if e.is_transient())
    }
}

/// Classifies a fiscal-system port failure
///
/// Transient faults ("system down", timeouts, unclassified connection
/// errors) log at ERROR and surface as [`PaymentError::FiscalUnavailable`];
/// recognized business rejections log at WARNING and surface as
/// [`PaymentError::FiscalBusiness`] so the caller can choose a targeted
/// transition and notification.
pub fn classify_fiscal_error(err: PortError) -> PaymentError {
    match err {
        PortError::Rejected { code, message, service } => {
            warn!(%service, %code, %message, "fiscal system rejected request");
            PaymentError::FiscalBusiness { code, message }
        }
        other => {
            error!(error = %other, "fiscal system call failed");
            PaymentError::FiscalUnavailable(other)
        }
    }
}

/// Stable code the fiscal system uses for a bad bank account
pub const FISCAL_CODE_INVALID_BANK_ACCOUNT: &str = "INVALID_BANK_ACCOUNT";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classified_as_business() {
        let err = classify_fiscal_error(PortError::rejected(
            "fiscal",
            FISCAL_CODE_INVALID_BANK_ACCOUNT,
            "account digits failed validation",
        ));
        assert!(matches!(err, PaymentError::FiscalBusiness { .. }));
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "FISCAL_REJECTED");
    }

    #[test]
    fn test_connection_failure_classified_as_transient() {
        let err = classify_fiscal_error(PortError::connection("dns failure"));
        assert!(matches!(err, PaymentError::FiscalUnavailable(_)));
        assert!(err.is_retryable());
    }
}
