//! Shared ledger code tables

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment method codes
///
/// The closed set of settlement channels. Behavior per method lives in the
/// payment-system services; entities only carry the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Credit card through the hosted gateway redirect flow
    DirectPay,
    /// Pre-authorized debit
    Pad,
    /// Online banking bill payment
    OnlineBanking,
    /// Electronic funds transfer (pooled deposits matched to short names)
    Eft,
    /// Internal settlement against a routing slip or staff payment
    Internal,
    /// Electronic journal voucher between ministries
    Ejv,
    /// Drawdown against a prepaid account
    Drawdown,
}

impl PaymentMethod {
    /// Methods whose settlement is deferred to a batch job rather than
    /// completing within the request
    pub fn is_deferred(&self) -> bool {
        matches!(
            self,
            PaymentMethod::Pad
                | PaymentMethod::Eft
                | PaymentMethod::OnlineBanking
                | PaymentMethod::Ejv
        )
    }

    /// Methods backed by a fiscal-system customer profile and site
    pub fn requires_fiscal_profile(&self) -> bool {
        matches!(
            self,
            PaymentMethod::Pad | PaymentMethod::OnlineBanking | PaymentMethod::Eft
        )
    }

    /// Refunding a paid invoice issues a credit memo instead of a bank
    /// reversal for these methods
    pub fn refunds_as_credit(&self) -> bool {
        matches!(self, PaymentMethod::Pad | PaymentMethod::OnlineBanking)
    }

    pub fn code(&self) -> &'static str {
        match self {
            PaymentMethod::DirectPay => "DIRECT_PAY",
            PaymentMethod::Pad => "PAD",
            PaymentMethod::OnlineBanking => "ONLINE_BANKING",
            PaymentMethod::Eft => "EFT",
            PaymentMethod::Internal => "INTERNAL",
            PaymentMethod::Ejv => "EJV",
            PaymentMethod::Drawdown => "DRAWDOWN",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Payment system codes - which back office settles the money
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentSystem {
    /// The fiscal back office (customer profiles, invoices, receipts)
    Fiscal,
    /// The prepaid drawdown provider
    Drawdown,
    /// Settled entirely within this ledger
    Internal,
}

/// Disbursement lifecycle for partner-share forwarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisbursementStatus {
    WaitingForJob,
    Uploaded,
    Completed,
    Cancelled,
    Reversed,
}

/// Corp type code for the product line that raised the invoice
///
/// Open set owned by the registry; carried opaquely and used for EJV batch
/// grouping and notification exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorpType(pub String);

impl CorpType {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deferred_methods() {
        assert!(PaymentMethod::Pad.is_deferred());
        assert!(PaymentMethod::Eft.is_deferred());
        assert!(!PaymentMethod::DirectPay.is_deferred());
        assert!(!PaymentMethod::Internal.is_deferred());
    }

    #[test]
    fn test_fiscal_profile_methods() {
        assert!(PaymentMethod::Pad.requires_fiscal_profile());
        assert!(PaymentMethod::OnlineBanking.requires_fiscal_profile());
        assert!(PaymentMethod::Eft.requires_fiscal_profile());
        assert!(!PaymentMethod::Drawdown.requires_fiscal_profile());
        assert!(!PaymentMethod::Ejv.requires_fiscal_profile());
    }

    #[test]
    fn test_credit_refund_methods() {
        assert!(PaymentMethod::Pad.refunds_as_credit());
        assert!(PaymentMethod::OnlineBanking.refunds_as_credit());
        assert!(!PaymentMethod::DirectPay.refunds_as_credit());
    }
}
