//! GL line building
//!
//! Translates invoice line items into the account-string/amount pairs every
//! fiscal-system call carries. Service fees post against the companion
//! service-fee distribution when one is configured.

use std::collections::HashMap;

use core_kernel::{DistributionCodeId, Money};
use domain_ledger::PaymentLineItem;
use serde::{Deserialize, Serialize};

use crate::code::DistributionCode;
use crate::error::DistributionError;

/// One GL posting line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlLine {
    pub account_string: String,
    pub amount: Money,
}

/// Builds the GL lines for a set of invoice line items
///
/// Amounts posting to the same account string are merged into one line.
/// The filing, priority and future-effective fees post against the line's
/// distribution code; the service fee posts against the companion
/// service-fee code when configured, otherwise against the same code.
pub fn build_gl_lines(
    line_items: &[PaymentLineItem],
    codes: &HashMap<DistributionCodeId, DistributionCode>,
) -> Result<Vec<GlLine>, DistributionError> {
    let mut merged: Vec<(String, Money)> = Vec::new();

    let mut push = |account: String, amount: Money| {
        if !amount.is_positive() {
            return;
        }
        if let Some(entry) = merged.iter_mut().find(|(a, _)| *a == account) {
            entry.1 = entry.1 + amount;
        } else {
            merged.push((account, amount));
        }
    };

    for item in line_items {
        let code_id = item
            .distribution_code_id
            .ok_or_else(|| DistributionError::MissingCode(item.id.to_string()))?;
        let code = codes
            .get(&code_id)
            .ok_or_else(|| DistributionError::CodeNotFound(code_id.to_string()))?;

        let revenue = item.filing_fee + item.priority_fee + item.future_effective_fee + item.gst;
        push(code.coding.account_string(), revenue);

        if item.service_fee.is_positive() {
            let fee_code = code
                .service_fee_distribution_id
                .and_then(|id| codes.get(&id))
                .unwrap_or(code);
            push(fee_code.coding.account_string(), item.service_fee);
        }
    }

    Ok(merged
        .into_iter()
        .map(|(account_string, amount)| GlLine { account_string, amount })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::GlCoding;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn code(stob: &str) -> DistributionCode {
        DistributionCode::new(
            format!("code-{stob}"),
            GlCoding::new("112", "32041", "35301", stob, "3200000").unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn test_lines_merge_by_account_string() {
        let revenue = code("1278");
        let mut codes = HashMap::new();
        codes.insert(revenue.id, revenue.clone());

        let a = PaymentLineItem::new("Filing A", Money::cad(dec!(30.00)))
            .with_distribution_code(revenue.id);
        let b = PaymentLineItem::new("Filing B", Money::cad(dec!(20.00)))
            .with_distribution_code(revenue.id);

        let lines = build_gl_lines(&[a, b], &codes).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amount.amount(), dec!(50.00));
    }

    #[test]
    fn test_service_fee_posts_to_companion_code() {
        let fee_code = code("1299");
        let revenue = code("1278").with_service_fee_distribution(fee_code.id);
        let mut codes = HashMap::new();
        codes.insert(fee_code.id, fee_code.clone());
        codes.insert(revenue.id, revenue.clone());

        let item = PaymentLineItem::new("Filing", Money::cad(dec!(30.00)))
            .with_service_fee(Money::cad(dec!(1.50)))
            .with_distribution_code(revenue.id);

        let lines = build_gl_lines(&[item], &codes).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].account_string, revenue.coding.account_string());
        assert_eq!(lines[1].account_string, fee_code.coding.account_string());
        assert_eq!(lines[1].amount.amount(), dec!(1.50));
    }

    #[test]
    fn test_missing_code_is_an_error() {
        let item = PaymentLineItem::new("Filing", Money::cad(dec!(30.00)));
        let err = build_gl_lines(&[item], &HashMap::new()).unwrap_err();
        assert!(matches!(err, DistributionError::MissingCode(_)));
    }
}
