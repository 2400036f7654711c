//! Inbound account requests
//!
//! Field validation happens here, before any domain mutation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use domain_ledger::PaymentMethod;

use crate::error::AccountError;

/// Bank details supplied on a PAD request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PaymentInfo {
    #[validate(length(min = 3, max = 4))]
    pub bank_number: String,
    #[validate(length(min = 4, max = 5))]
    pub branch_number: String,
    #[validate(length(min = 7, max = 12))]
    pub account_number: String,
}

impl PaymentInfo {
    fn digits_only(&self) -> bool {
        [&self.bank_number, &self.branch_number, &self.account_number]
            .iter()
            .all(|v| v.chars().all(|c| c.is_ascii_digit()))
    }
}

/// A create/update request for a payment account
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AccountRequest {
    #[validate(length(min = 1, max = 50))]
    pub auth_account_id: String,
    #[validate(length(min = 1, max = 250))]
    pub name: String,
    pub payment_method: PaymentMethod,
    /// Contact address for provisioning-failure notifications
    #[validate(email)]
    pub contact_email: Option<String>,
    #[validate(nested)]
    pub payment_info: Option<PaymentInfo>,
}

impl AccountRequest {
    /// Validates the request, including the method-specific requirements
    pub fn validated(self) -> Result<Self, AccountError> {
        self.validate()
            .map_err(|e| AccountError::Validation(e.to_string()))?;
        match (&self.payment_method, &self.payment_info) {
            (PaymentMethod::Pad, None) => {
                return Err(AccountError::Validation(
                    "PAD requires bank details".to_string(),
                ));
            }
            (_, Some(info)) if !info.digits_only() => {
                return Err(AccountError::Validation(
                    "bank details must be numeric".to_string(),
                ));
            }
            _ => {}
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: PaymentMethod, info: Option<PaymentInfo>) -> AccountRequest {
        AccountRequest {
            auth_account_id: "auth-1".to_string(),
            name: "Acme Filings".to_string(),
            payment_method: method,
            contact_email: Some("billing@example.com".to_string()),
            payment_info: info,
        }
    }

    fn bank() -> PaymentInfo {
        PaymentInfo {
            bank_number: "001".to_string(),
            branch_number: "00720".to_string(),
            account_number: "1234567".to_string(),
        }
    }

    #[test]
    fn test_pad_requires_bank_details() {
        assert!(request(PaymentMethod::Pad, None).validated().is_err());
        assert!(request(PaymentMethod::Pad, Some(bank())).validated().is_ok());
        assert!(request(PaymentMethod::OnlineBanking, None).validated().is_ok());
    }

    #[test]
    fn test_bank_fields_must_be_digits() {
        let mut info = bank();
        info.bank_number = "0x1".to_string();
        assert!(request(PaymentMethod::Pad, Some(info)).validated().is_err());
    }
}
