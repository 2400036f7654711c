//! Cross-domain payment flow tests

mod common;

use chrono::Utc;
use rust_decimal_macros::dec;

use domain_account::{BankDetails, CfsAccount, CfsAccountStatus};
use domain_ledger::{
    InvoiceReference, InvoiceStatus, PaymentMethod, Refund, RefundLineType, RefundPartialLine,
};
use domain_payment::{
    payment_system_for, LedgerEvent, NotificationTemplate, PaymentError, PaymentSystemService,
};
use domain_statement::{StatementFrequency, StatementSettings};
use interface_jobs::flows::switch_payment_method;
use test_utils::{line_item, TestAccountBuilder, TestHarness, TestInvoiceBuilder};

fn active_cfs(account_id: core_kernel::AccountId, method: PaymentMethod) -> CfsAccount {
    let mut cfs = CfsAccount::pending(account_id, method);
    cfs.provisioned("11111", "22222", "33333").unwrap();
    if cfs.status == CfsAccountStatus::PendingPadActivation {
        cfs.transition_to(CfsAccountStatus::Active).unwrap();
    }
    cfs
}

#[tokio::test]
async fn switching_to_eft_closes_the_cycle_with_an_interim_statement() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Pad).build();
    harness.stores.put_cfs_account(active_cfs(account.id, PaymentMethod::Pad));
    harness.stores.put_account(account.clone());

    let today = Utc::now().date_naive();
    harness.stores.put_statement_settings(StatementSettings::new(
        account.id,
        StatementFrequency::Weekly,
        today - chrono::Duration::days(30),
    ));
    harness.stores.put_invoice(
        TestInvoiceBuilder::new()
            .for_account(account.id)
            .with_method(PaymentMethod::Pad)
            .build(),
    );

    let ctx = common::job_ctx(&harness, Utc::now());
    switch_payment_method(&ctx, account.id, PaymentMethod::Eft, None)
        .await
        .unwrap();

    // interim statement closed the running weekly cycle
    let statements = harness.stores.statements.lock().unwrap();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].is_interim);
    assert_eq!(statements[0].payment_method, PaymentMethod::Pad);
    drop(statements);

    // successor settings: monthly, notifications on, recipients backfilled
    let settings = harness.stores.statement_settings.lock().unwrap();
    let current = settings.iter().find(|s| s.to_date.is_none()).unwrap();
    assert_eq!(current.frequency, StatementFrequency::Monthly);
    assert!(current.notification_enabled);
    assert_eq!(current.recipients, vec!["admin@example.com".to_string()]);
    drop(settings);

    let changes = harness.events.count_matching(|e| {
        matches!(e, LedgerEvent::PaymentMethodChanged { to: PaymentMethod::Eft, .. })
    });
    assert_eq!(changes, 1);
}

#[tokio::test]
async fn first_pad_entry_defers_the_switch_behind_the_confirmation_period() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new()
        .with_method(PaymentMethod::Drawdown)
        .build();
    harness.stores.put_account(account.clone());

    let ctx = common::job_ctx(&harness, Utc::now());
    let bank = BankDetails {
        bank_number: "0001".to_string(),
        branch_number: "00720".to_string(),
        account_number: "1234567".to_string(),
    };
    switch_payment_method(&ctx, account.id, PaymentMethod::Pad, Some(bank))
        .await
        .unwrap();

    let stored = harness
        .stores
        .accounts
        .lock()
        .unwrap()
        .get(&account.id)
        .cloned()
        .unwrap();
    assert_eq!(stored.payment_method, PaymentMethod::Pad);
    // invoicing still rides the old rail until activation
    assert_eq!(stored.effective_payment_method(ctx.now()), PaymentMethod::Drawdown);

    // a pending CFS row was provisioned with the bank details
    let pending = harness
        .stores
        .cfs_accounts_by_status_sync(CfsAccountStatus::Pending);
    assert_eq!(pending.len(), 1);
    assert!(pending[0].bank_details.is_some());

    // no method-change event until the activation job promotes the row
    let changes = harness
        .events
        .count_matching(|e| matches!(e, LedgerEvent::PaymentMethodChanged { .. }));
    assert_eq!(changes, 0);
}

#[tokio::test]
async fn pad_refund_settles_as_a_credit_memo() {
    let harness = TestHarness::new();
    let mut account = TestAccountBuilder::new().with_method(PaymentMethod::Pad).build();
    harness.stores.put_cfs_account(active_cfs(account.id, PaymentMethod::Pad));
    harness.stores.put_account(account.clone());

    let mut invoice = TestInvoiceBuilder::new()
        .for_account(account.id)
        .with_method(PaymentMethod::Pad)
        .with_total(dec!(131.50))
        .build();
    invoice.transition_to(InvoiceStatus::SettlementScheduled).unwrap();
    invoice.mark_paid(Utc::now()).unwrap();
    harness
        .stores
        .references
        .lock()
        .unwrap()
        .push(InvoiceReference::new(invoice.id, "PAD0000001"));
    harness.stores.put_invoice(invoice.clone());

    let service = payment_system_for(PaymentMethod::Pad, harness.ctx.clone());
    let refund = Refund::full(&invoice, "staff-user");
    let new_status = service
        .process_refund(&mut invoice, &mut account, &refund)
        .await
        .unwrap();

    assert_eq!(new_status, InvoiceStatus::Credited);

    // local credit row and aggregate balance both carry the refund
    let credits = harness.stores.credits.lock().unwrap();
    assert_eq!(credits.len(), 1);
    let credit = credits.values().next().unwrap();
    assert!(credit.is_credit_memo);
    assert_eq!(credit.remaining_amount.amount(), dec!(131.50));
    drop(credits);

    let stored = harness
        .stores
        .accounts
        .lock()
        .unwrap()
        .get(&account.id)
        .cloned()
        .unwrap();
    assert_eq!(stored.credit.amount(), dec!(131.50));

    let credit_events = harness
        .events
        .count_matching(|e| matches!(e, LedgerEvent::CreditAdded { .. }));
    assert_eq!(credit_events, 1);
    let mails = harness.mailer.messages();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].template, NotificationTemplate::CreditAdded);
}

#[tokio::test]
async fn partial_refund_over_the_ceiling_mutates_nothing() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new()
        .with_method(PaymentMethod::DirectPay)
        .build();
    harness.stores.put_account(account.clone());

    let item = line_item(dec!(30.00), dec!(1.50), dec!(100.00));
    let item_id = item.id;
    let mut invoice = TestInvoiceBuilder::new()
        .for_account(account.id)
        .with_method(PaymentMethod::DirectPay)
        .with_total(dec!(131.50))
        .with_line_item(item)
        .build();
    invoice.mark_paid(Utc::now()).unwrap();
    harness.stores.put_invoice(invoice.clone());

    let lines = vec![RefundPartialLine::new(
        item_id,
        RefundLineType::BaseFee,
        core_kernel::Money::cad(dec!(31.00)),
    )];
    let err = Refund::partial(&invoice, lines, "staff-user").unwrap_err();
    assert!(matches!(err, domain_ledger::LedgerError::RefundExceedsCeiling { .. }));

    // no refund row, no invoice change
    assert!(harness.stores.refunds.lock().unwrap().is_empty());
    let unchanged = harness.stores.invoice(invoice.id).unwrap();
    assert_eq!(unchanged.status, InvoiceStatus::Paid);
    assert!(unchanged.refund.is_zero());
}

#[tokio::test]
async fn overdue_invoices_block_new_invoicing() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Pad).build();
    harness.stores.put_cfs_account(active_cfs(account.id, PaymentMethod::Pad));
    harness.stores.put_account(account.clone());
    harness.stores.put_invoice(
        TestInvoiceBuilder::new()
            .for_account(account.id)
            .with_method(PaymentMethod::Pad)
            .with_status(InvoiceStatus::Overdue)
            .build(),
    );

    let service = payment_system_for(PaymentMethod::Pad, harness.ctx.clone());
    let mut fresh = TestInvoiceBuilder::new()
        .for_account(account.id)
        .with_method(PaymentMethod::Pad)
        .build();
    let err = service
        .create_invoice(&account, &mut fresh)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Blocked { .. }));
}
