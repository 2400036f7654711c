//! PAD activation job tests

mod common;

use chrono::Duration;

use core_kernel::clock::test_clock_at;
use domain_account::{CfsAccount, CfsAccountStatus};
use domain_ledger::PaymentMethod;
use domain_payment::LedgerEvent;
use interface_jobs::tasks::activate_pad;
use interface_jobs::JobSettings;
use test_utils::{TestAccountBuilder, TestHarness};

#[tokio::test]
async fn activation_waits_out_the_confirmation_period() {
    let harness = TestHarness::new();
    let clock = test_clock_at(2024, 7, 1, 12, 0);
    let now = clock.now();

    // account switched to PAD today with a 3-day confirmation period
    let mut account = TestAccountBuilder::new()
        .with_method(PaymentMethod::Drawdown)
        .build();
    account.payment_method = PaymentMethod::Pad;
    account.previous_payment_method = Some(PaymentMethod::Drawdown);
    account.pad_activation_date = Some(now + Duration::days(3));
    let mut cfs = CfsAccount::pending(account.id, PaymentMethod::Pad);
    cfs.provisioned("11111", "22222", "33333").unwrap();
    assert_eq!(cfs.status, CfsAccountStatus::PendingPadActivation);
    harness.stores.put_cfs_account(cfs);
    harness.stores.put_account(account.clone());

    let ctx = common::job_ctx_with(&harness, clock, JobSettings::default());

    // the effective method stays on the old rail during the wait
    assert_eq!(
        harness
            .stores
            .accounts
            .lock()
            .unwrap()
            .get(&account.id)
            .unwrap()
            .effective_payment_method(ctx.now()),
        PaymentMethod::Drawdown
    );

    // run at now: still waiting
    let result = activate_pad::run(&ctx).await;
    assert_eq!(result.processed, 0);
    assert_eq!(result.skipped, 1);
    let pending = harness
        .stores
        .cfs_accounts_by_status_sync(CfsAccountStatus::PendingPadActivation);
    assert_eq!(pending.len(), 1);

    // advance past the window and run again
    ctx.clock
        .test_control()
        .unwrap()
        .advance(Duration::days(3) + Duration::minutes(1));
    let result = activate_pad::run(&ctx).await;
    assert_eq!(result.processed, 1);

    let active = harness
        .stores
        .cfs_accounts_by_status_sync(CfsAccountStatus::Active);
    assert_eq!(active.len(), 1);

    let stored = harness
        .stores
        .accounts
        .lock()
        .unwrap()
        .get(&account.id)
        .cloned()
        .unwrap();
    assert!(stored.pad_activated);
    assert_eq!(stored.effective_payment_method(ctx.now()), PaymentMethod::Pad);

    // the method-change event fired exactly once at promotion
    let changes = harness.events.count_matching(|e| {
        matches!(e, LedgerEvent::PaymentMethodChanged { to: PaymentMethod::Pad, .. })
    });
    assert_eq!(changes, 1);
}

#[tokio::test]
async fn rerun_after_promotion_publishes_nothing_new() {
    let harness = TestHarness::new();
    let clock = test_clock_at(2024, 7, 10, 12, 0);
    let now = clock.now();

    let mut account = TestAccountBuilder::new()
        .with_method(PaymentMethod::Drawdown)
        .build();
    account.payment_method = PaymentMethod::Pad;
    account.previous_payment_method = Some(PaymentMethod::Drawdown);
    account.pad_activation_date = Some(now - Duration::days(1));
    let mut cfs = CfsAccount::pending(account.id, PaymentMethod::Pad);
    cfs.provisioned("11111", "22222", "33333").unwrap();
    harness.stores.put_cfs_account(cfs);
    harness.stores.put_account(account);

    let ctx = common::job_ctx_with(&harness, clock, JobSettings::default());
    activate_pad::run(&ctx).await;
    let first = harness.events.events().len();

    // the precondition status is gone; a second run finds nothing
    let result = activate_pad::run(&ctx).await;
    assert_eq!(result.processed, 0);
    assert_eq!(harness.events.events().len(), first);
}
