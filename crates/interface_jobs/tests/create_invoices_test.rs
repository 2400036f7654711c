//! Invoice-creation job tests

mod common;

use chrono::Utc;
use rust_decimal_macros::dec;

use domain_account::{CfsAccount, CfsAccountStatus};
use domain_ledger::{InvoiceStatus, PaymentMethod};
use interface_jobs::tasks::create_invoices;
use test_utils::{TestAccountBuilder, TestHarness, TestInvoiceBuilder};

fn provisioned_cfs(account: &domain_account::PaymentAccount, method: PaymentMethod) -> CfsAccount {
    let mut cfs = CfsAccount::pending(account.id, method);
    cfs.provisioned("11111", "22222", "33333").unwrap();
    if cfs.status == CfsAccountStatus::PendingPadActivation {
        cfs.transition_to(CfsAccountStatus::Active).unwrap();
    }
    cfs
}

#[tokio::test]
async fn pad_invoices_batch_into_one_fiscal_call_per_account() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Pad).build();
    harness.stores.put_cfs_account(provisioned_cfs(&account, PaymentMethod::Pad));
    harness.stores.put_account(account.clone());

    for _ in 0..3 {
        harness.stores.put_invoice(
            TestInvoiceBuilder::new()
                .for_account(account.id)
                .with_method(PaymentMethod::Pad)
                .with_total(dec!(50.00))
                .build(),
        );
    }

    // run the day after creation so the cutoff has passed
    let ctx = common::job_ctx(&harness, Utc::now() + chrono::Duration::days(1));
    let result = create_invoices::run(&ctx).await;

    assert!(!result.has_failures());
    assert_eq!(harness.fiscal.invoice_call_count(), 1);

    let scheduled = harness
        .stores
        .invoices_with_status(InvoiceStatus::SettlementScheduled);
    assert_eq!(scheduled.len(), 3);

    // all three share the consolidated invoice number
    let references = harness.stores.references.lock().unwrap();
    let numbers: std::collections::HashSet<_> =
        references.iter().map(|r| r.invoice_number.clone()).collect();
    assert_eq!(numbers.len(), 1);
}

#[tokio::test]
async fn second_run_makes_zero_external_calls() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Pad).build();
    harness.stores.put_cfs_account(provisioned_cfs(&account, PaymentMethod::Pad));
    harness.stores.put_account(account.clone());
    harness.stores.put_invoice(
        TestInvoiceBuilder::new()
            .for_account(account.id)
            .with_method(PaymentMethod::Pad)
            .build(),
    );

    let ctx = common::job_ctx(&harness, Utc::now() + chrono::Duration::days(1));
    create_invoices::run(&ctx).await;
    assert_eq!(harness.fiscal.invoice_call_count(), 1);

    // idempotent re-run: nothing eligible, no external call
    let result = create_invoices::run(&ctx).await;
    assert!(!result.has_failures());
    assert_eq!(result.processed, 0);
    assert_eq!(harness.fiscal.invoice_call_count(), 1);
}

#[tokio::test]
async fn frozen_account_is_not_invoiced() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Pad).build();
    let mut cfs = provisioned_cfs(&account, PaymentMethod::Pad);
    cfs.transition_to(CfsAccountStatus::Freeze).unwrap();
    harness.stores.put_cfs_account(cfs);
    harness.stores.put_account(account.clone());
    harness.stores.put_invoice(
        TestInvoiceBuilder::new()
            .for_account(account.id)
            .with_method(PaymentMethod::Pad)
            .build(),
    );

    let ctx = common::job_ctx(&harness, Utc::now() + chrono::Duration::days(1));
    let result = create_invoices::run(&ctx).await;

    assert!(!result.has_failures());
    assert_eq!(harness.fiscal.invoice_call_count(), 0);
    let invoice = harness
        .stores
        .invoices_with_status(InvoiceStatus::Approved);
    assert_eq!(invoice.len(), 1);
}

#[tokio::test]
async fn fiscal_outage_leaves_state_unchanged_for_retry() {
    let harness = TestHarness::new();
    harness.fiscal.set_unavailable(true);
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Pad).build();
    harness.stores.put_cfs_account(provisioned_cfs(&account, PaymentMethod::Pad));
    harness.stores.put_account(account.clone());
    harness.stores.put_invoice(
        TestInvoiceBuilder::new()
            .for_account(account.id)
            .with_method(PaymentMethod::Pad)
            .build(),
    );

    let ctx = common::job_ctx(&harness, Utc::now() + chrono::Duration::days(1));
    let result = create_invoices::run(&ctx).await;
    assert!(result.has_failures());

    // invoice still approved; a later run picks it up
    harness.fiscal.set_unavailable(false);
    let result = create_invoices::run(&ctx).await;
    assert!(!result.has_failures());
    assert_eq!(result.processed, 1);
}

#[tokio::test]
async fn online_banking_gets_one_fiscal_invoice_per_invoice() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new()
        .with_method(PaymentMethod::OnlineBanking)
        .build();
    harness
        .stores
        .put_cfs_account(provisioned_cfs(&account, PaymentMethod::OnlineBanking));
    harness.stores.put_account(account.clone());
    for _ in 0..2 {
        harness.stores.put_invoice(
            TestInvoiceBuilder::new()
                .for_account(account.id)
                .with_method(PaymentMethod::OnlineBanking)
                .build(),
        );
    }

    let ctx = common::job_ctx(&harness, Utc::now() + chrono::Duration::days(1));
    let result = create_invoices::run(&ctx).await;

    assert!(!result.has_failures());
    assert_eq!(harness.fiscal.invoice_call_count(), 2);
}
