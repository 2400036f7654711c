//! EFT credit-application job tests

mod common;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use core_kernel::ShortNameId;
use domain_account::{CfsAccount, CfsAccountStatus};
use domain_ledger::{InvoiceStatus, PaymentMethod};
use domain_payment::LedgerEvent;
use interface_jobs::tasks::apply_eft_credits;
use test_utils::{eft_credit, TestAccountBuilder, TestHarness, TestInvoiceBuilder};

#[tokio::test]
async fn credits_apply_oldest_first_and_settle_invoices() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Eft).build();
    harness.stores.put_account(account.clone());

    let short_name = ShortNameId::new();
    let base = Utc::now() - Duration::days(2);
    harness
        .stores
        .put_eft_credit(eft_credit(short_name, account.id, dec!(4.50), base));
    harness.stores.put_eft_credit(eft_credit(
        short_name,
        account.id,
        dec!(91.00),
        base + Duration::hours(1),
    ));

    let invoice = TestInvoiceBuilder::new()
        .for_account(account.id)
        .with_method(PaymentMethod::Eft)
        .with_total(dec!(50.00))
        .build();
    let invoice_id = invoice.id;
    harness.stores.put_invoice(invoice);

    let ctx = common::job_ctx(&harness, Utc::now());
    let result = apply_eft_credits::run(&ctx).await;
    assert!(!result.has_failures());
    assert_eq!(result.processed, 1);

    let settled = harness.stores.invoice(invoice_id).unwrap();
    assert_eq!(settled.status, InvoiceStatus::Paid);
    assert!(settled.payment_date.is_some());

    // the older credit went first
    let credits = harness.stores.eft_credits.lock().unwrap();
    assert_eq!(credits[0].remaining_amount.amount(), dec!(0));
    assert_eq!(credits[1].remaining_amount.amount(), dec!(45.50));
    drop(credits);

    // two consumption links, a receipt and a completed payment exist
    assert_eq!(harness.stores.eft_links.lock().unwrap().len(), 2);
    assert_eq!(harness.stores.receipts.lock().unwrap().len(), 1);
    let completions = harness
        .events
        .count_matching(|e| matches!(e, LedgerEvent::PaymentCompleted { .. }));
    assert_eq!(completions, 1);
}

#[tokio::test]
async fn exhausted_credits_leave_invoice_partial() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Eft).build();
    harness.stores.put_account(account.clone());
    harness.stores.put_eft_credit(eft_credit(
        ShortNameId::new(),
        account.id,
        dec!(45.50),
        Utc::now() - Duration::days(1),
    ));

    let invoice = TestInvoiceBuilder::new()
        .for_account(account.id)
        .with_method(PaymentMethod::Eft)
        .with_total(dec!(50.00))
        .build();
    let invoice_id = invoice.id;
    harness.stores.put_invoice(invoice);

    let ctx = common::job_ctx(&harness, Utc::now());
    apply_eft_credits::run(&ctx).await;

    let partial = harness.stores.invoice(invoice_id).unwrap();
    assert_eq!(partial.status, InvoiceStatus::Partial);
    assert_eq!(partial.paid.amount(), dec!(45.50));

    // re-run with nothing left: no double deduction
    let result = apply_eft_credits::run(&ctx).await;
    assert!(!result.has_failures());
    let unchanged = harness.stores.invoice(invoice_id).unwrap();
    assert_eq!(unchanged.paid.amount(), dec!(45.50));
}

#[tokio::test]
async fn settling_the_last_overdue_invoice_unlocks_the_account() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Eft).build();
    let mut cfs = CfsAccount::pending(account.id, PaymentMethod::Eft);
    cfs.provisioned("1", "2", "3").unwrap();
    cfs.transition_to(CfsAccountStatus::Freeze).unwrap();
    harness.stores.put_cfs_account(cfs);
    harness.stores.put_account(account.clone());

    harness.stores.put_eft_credit(eft_credit(
        ShortNameId::new(),
        account.id,
        dec!(100.00),
        Utc::now() - Duration::days(1),
    ));
    harness.stores.put_invoice(
        TestInvoiceBuilder::new()
            .for_account(account.id)
            .with_method(PaymentMethod::Eft)
            .with_total(dec!(60.00))
            .with_status(InvoiceStatus::Overdue)
            .build(),
    );

    let ctx = common::job_ctx(&harness, Utc::now());
    let result = apply_eft_credits::run(&ctx).await;
    assert!(!result.has_failures());

    let active = harness
        .stores
        .cfs_accounts_by_status_sync(CfsAccountStatus::Active);
    assert_eq!(active.len(), 1);
    let unlocks = harness
        .events
        .count_matching(|e| matches!(e, LedgerEvent::AccountUnlocked { .. }));
    assert_eq!(unlocks, 1);
}
