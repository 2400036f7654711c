//! Invoice line items with their fee breakdown
//!
//! The fee components matter to the refund path: each partial-refund line
//! is capped by the matching component on the line item it refunds.

use serde::{Deserialize, Serialize};

use core_kernel::{DistributionCodeId, LineItemId, Money};

use crate::refund::RefundLineType;

/// Line item status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemStatus {
    Active,
    Cancelled,
}

/// One fee line on an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLineItem {
    pub id: LineItemId,
    pub description: String,
    pub status: LineItemStatus,
    /// GL coding template used when posting this line
    pub distribution_code_id: Option<DistributionCodeId>,
    /// Base filing fee
    pub filing_fee: Money,
    /// Service (transaction) fee
    pub service_fee: Money,
    /// Priority-handling surcharge
    pub priority_fee: Money,
    /// Future-effective filing surcharge
    pub future_effective_fee: Money,
    /// GST on the line
    pub gst: Money,
}

impl PaymentLineItem {
    pub fn new(description: impl Into<String>, filing_fee: Money) -> Self {
        let currency = filing_fee.currency();
        Self {
            id: LineItemId::new_v7(),
            description: description.into(),
            status: LineItemStatus::Active,
            distribution_code_id: None,
            filing_fee,
            service_fee: Money::zero(currency),
            priority_fee: Money::zero(currency),
            future_effective_fee: Money::zero(currency),
            gst: Money::zero(currency),
        }
    }

    pub fn with_service_fee(mut self, fee: Money) -> Self {
        self.service_fee = fee;
        self
    }

    pub fn with_priority_fee(mut self, fee: Money) -> Self {
        self.priority_fee = fee;
        self
    }

    pub fn with_future_effective_fee(mut self, fee: Money) -> Self {
        self.future_effective_fee = fee;
        self
    }

    pub fn with_gst(mut self, gst: Money) -> Self {
        self.gst = gst;
        self
    }

    pub fn with_distribution_code(mut self, id: DistributionCodeId) -> Self {
        self.distribution_code_id = Some(id);
        self
    }

    /// Line total across all fee components
    pub fn total(&self) -> Money {
        self.filing_fee + self.service_fee + self.priority_fee + self.future_effective_fee + self.gst
    }

    /// The ceiling a partial refund of the given type may not exceed
    pub fn refundable_ceiling(&self, refund_type: RefundLineType) -> Money {
        match refund_type {
            RefundLineType::BaseFee => self.filing_fee,
            RefundLineType::ServiceFee => self.service_fee,
            RefundLineType::PriorityFee => self.priority_fee,
            RefundLineType::FutureEffectiveFee => self.future_effective_fee,
        }
    }

    pub fn cancel(&mut self) {
        self.status = LineItemStatus::Cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_total() {
        let line = PaymentLineItem::new("Annual report", Money::cad(dec!(43.39)))
            .with_service_fee(Money::cad(dec!(1.50)))
            .with_priority_fee(Money::cad(dec!(100.00)))
            .with_gst(Money::cad(dec!(2.17)));

        assert_eq!(line.total().amount(), dec!(147.06));
    }

    #[test]
    fn test_refund_ceilings_track_components() {
        let line = PaymentLineItem::new("Name request", Money::cad(dec!(30.00)))
            .with_service_fee(Money::cad(dec!(1.50)))
            .with_future_effective_fee(Money::cad(dec!(100.00)));

        assert_eq!(line.refundable_ceiling(RefundLineType::BaseFee).amount(), dec!(30.00));
        assert_eq!(line.refundable_ceiling(RefundLineType::ServiceFee).amount(), dec!(1.50));
        assert_eq!(line.refundable_ceiling(RefundLineType::PriorityFee).amount(), dec!(0));
        assert_eq!(
            line.refundable_ceiling(RefundLineType::FutureEffectiveFee).amount(),
            dec!(100.00)
        );
    }
}
