//! Scenario tests for the ledger primitives

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;

use core_kernel::{AccountId, Money, ShortNameId};

use domain_ledger::credit::{apply_eft_credits, EftCredit};
use domain_ledger::invoice::{Invoice, InvoiceStatus};
use domain_ledger::invoice_reference::{InvoiceReference, InvoiceReferenceStatus};
use domain_ledger::refund::{Refund, RefundLineType, RefundPartialLine};
use domain_ledger::routing_slip::{RoutingSlip, RoutingSlipStatus};
use domain_ledger::{CorpType, LedgerError, PaymentLineItem, PaymentMethod};

fn invoice(method: PaymentMethod, total: rust_decimal::Decimal) -> Invoice {
    Invoice::new(
        AccountId::new(),
        method,
        CorpType::new("BEN"),
        Money::cad(total),
        Money::cad(dec!(1.50)),
        Money::cad(dec!(0)),
    )
}

// ============================================================================
// Invoice lifecycle
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_pad_settlement_and_credit_memo_refund_path() {
        let mut inv = invoice(PaymentMethod::Pad, dec!(131.50));
        assert_eq!(inv.status, InvoiceStatus::Approved);

        inv.transition_to(InvoiceStatus::SettlementScheduled).unwrap();
        inv.mark_paid(Utc::now()).unwrap();
        inv.transition_to(InvoiceStatus::RefundRequested).unwrap();
        inv.transition_to(InvoiceStatus::Credited).unwrap();
        assert!(inv.status.is_terminal());
    }

    #[test]
    fn test_direct_pay_refund_path_requires_gl_confirmation() {
        let mut inv = invoice(PaymentMethod::DirectPay, dec!(31.50));
        inv.mark_paid(Utc::now()).unwrap();
        inv.transition_to(InvoiceStatus::RefundRequested).unwrap();

        // the poll confirms, then the refund lands
        inv.mark_refunded(Money::cad(dec!(31.50)), Utc::now()).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Refunded);
        assert_eq!(inv.refund.amount(), dec!(31.50));
    }

    #[test]
    fn test_skipping_settlement_scheduling_is_rejected_for_refunds() {
        let mut inv = invoice(PaymentMethod::Pad, dec!(131.50));
        let err = inv.transition_to(InvoiceStatus::Refunded).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }
}

// ============================================================================
// EFT credit application
// ============================================================================

mod credit_tests {
    use super::*;

    #[test]
    fn test_fifo_application_across_three_credits() {
        let mut inv = invoice(PaymentMethod::Eft, dec!(100.00));
        let short_name = ShortNameId::new();
        let base = Utc::now();
        let mut pool = vec![
            EftCredit::new(short_name, Money::cad(dec!(40.00)), base),
            EftCredit::new(short_name, Money::cad(dec!(40.00)), base + Duration::seconds(1)),
            EftCredit::new(short_name, Money::cad(dec!(40.00)), base + Duration::seconds(2)),
        ];

        let application = apply_eft_credits(&mut inv, &mut pool, Utc::now()).unwrap();

        assert_eq!(application.applied.amount(), dec!(100.00));
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(pool[0].remaining_amount.amount(), dec!(0));
        assert_eq!(pool[1].remaining_amount.amount(), dec!(0));
        assert_eq!(pool[2].remaining_amount.amount(), dec!(20.00));
    }

    #[test]
    fn test_creation_order_beats_slice_order() {
        let mut inv = invoice(PaymentMethod::Eft, dec!(10.00));
        let short_name = ShortNameId::new();
        let base = Utc::now();
        // newest first in the slice; FIFO must still pick the oldest
        let mut pool = vec![
            EftCredit::new(short_name, Money::cad(dec!(50.00)), base + Duration::hours(1)),
            EftCredit::new(short_name, Money::cad(dec!(50.00)), base),
        ];

        apply_eft_credits(&mut inv, &mut pool, Utc::now()).unwrap();

        assert_eq!(pool[0].remaining_amount.amount(), dec!(50.00));
        assert_eq!(pool[1].remaining_amount.amount(), dec!(40.00));
    }
}

// ============================================================================
// Partial refunds
// ============================================================================

mod refund_tests {
    use super::*;

    #[test]
    fn test_sum_of_partials_cannot_exceed_invoice_total() {
        let mut inv = invoice(PaymentMethod::DirectPay, dec!(50.00));
        let item = PaymentLineItem::new("Filing", Money::cad(dec!(40.00)))
            .with_priority_fee(Money::cad(dec!(40.00)));
        let item_id = item.id;
        inv.add_line_item(item);

        let lines = vec![
            RefundPartialLine::new(item_id, RefundLineType::BaseFee, Money::cad(dec!(40.00))),
            RefundPartialLine::new(item_id, RefundLineType::PriorityFee, Money::cad(dec!(40.00))),
        ];
        let err = Refund::partial(&inv, lines, "staff").unwrap_err();
        assert!(matches!(err, LedgerError::RefundExceedsInvoice { .. }));
    }

    #[test]
    fn test_zero_amount_lines_are_allowed() {
        let mut inv = invoice(PaymentMethod::DirectPay, dec!(31.50));
        let item = PaymentLineItem::new("Filing", Money::cad(dec!(30.00)));
        let item_id = item.id;
        inv.add_line_item(item);

        let lines = vec![RefundPartialLine::new(
            item_id,
            RefundLineType::BaseFee,
            Money::cad(dec!(0)),
        )];
        let refund = Refund::partial(&inv, lines, "staff").unwrap();
        assert!(refund.amount.is_zero());
    }
}

// ============================================================================
// Routing slips
// ============================================================================

mod routing_slip_tests {
    use super::*;

    #[test]
    fn test_pooled_funds_settle_an_invoice_then_bounce() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut parent = RoutingSlip::new("RS-1", Money::cad(dec!(10)), date);
        let mut child = RoutingSlip::new("RS-2", Money::cad(dec!(20)), date);
        child.link_to(&mut parent).unwrap();

        assert!(parent.has_balance_for(Money::cad(dec!(30))));
        parent.apply_payment(Money::cad(dec!(30))).unwrap();
        assert_eq!(parent.status, RoutingSlipStatus::Complete);

        parent.mark_nsf(Money::cad(dec!(30))).unwrap();
        parent.apply_nsf_fee(Money::cad(dec!(30))).unwrap();
        assert_eq!(parent.remaining_amount.amount(), dec!(-60));
    }

    #[test]
    fn test_linked_slip_cannot_settle() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut parent = RoutingSlip::new("RS-1", Money::cad(dec!(10)), date);
        let mut child = RoutingSlip::new("RS-2", Money::cad(dec!(20)), date);
        child.link_to(&mut parent).unwrap();

        assert!(!child.has_balance_for(Money::cad(dec!(1))));
        assert!(child.apply_payment(Money::cad(dec!(1))).is_err());
    }
}

// ============================================================================
// Invoice references
// ============================================================================

#[test]
fn test_reference_history_keeps_one_effective_row() {
    let inv = invoice(PaymentMethod::Pad, dec!(131.50));
    let mut first = InvoiceReference::new(inv.id, "PAD0000001");

    // consolidation replaces the reference
    first.cancel();
    let second = InvoiceReference::new(inv.id, "PAD0000002");

    assert_eq!(first.status, InvoiceReferenceStatus::Cancelled);
    assert!(second.is_active());
}
