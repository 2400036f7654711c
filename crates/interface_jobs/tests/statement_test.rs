//! Statement generation and due/overdue job tests

mod common;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;

use core_kernel::clock::test_clock;
use domain_account::{CfsAccount, CfsAccountStatus};
use domain_ledger::{InvoiceStatus, PaymentMethod};
use domain_payment::{LedgerEvent, NotificationTemplate};
use domain_statement::{
    generate_statements, StatementFrequency, StatementPeriod, StatementSettings,
};
use interface_jobs::tasks::{generate_statements as generation_task, statement_due};
use interface_jobs::JobSettings;
use test_utils::{TestAccountBuilder, TestHarness, TestInvoiceBuilder};

fn noon_utc(date: NaiveDate) -> chrono::DateTime<Utc> {
    date.and_hms_opt(19, 0, 0).unwrap().and_utc()
}

#[tokio::test]
async fn statements_never_mix_payment_methods() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Eft).build();
    harness.stores.put_account(account.clone());

    // a PAD invoice and an EFT invoice land in the same cycle
    harness.stores.put_invoice(
        TestInvoiceBuilder::new()
            .for_account(account.id)
            .with_method(PaymentMethod::Pad)
            .build(),
    );
    harness.stores.put_invoice(
        TestInvoiceBuilder::new()
            .for_account(account.id)
            .with_method(PaymentMethod::Eft)
            .build(),
    );

    let today = Utc::now().date_naive();
    harness.stores.put_statement_settings(StatementSettings::new(
        account.id,
        StatementFrequency::Monthly,
        today - Duration::days(60),
    ));

    // run on the first of next month so the current cycle has closed
    let run_date = core_kernel::temporal::month_end(today) + Duration::days(1);
    let ctx = common::job_ctx(&harness, noon_utc(run_date));
    let result = generation_task::run(&ctx).await;
    assert!(!result.has_failures());

    let statements = harness.stores.statements.lock().unwrap();
    assert_eq!(statements.len(), 2);
    let methods: Vec<_> = statements.iter().map(|s| s.payment_method).collect();
    assert!(methods.contains(&PaymentMethod::Pad));
    assert!(methods.contains(&PaymentMethod::Eft));
    // each statement carries exactly one invoice
    assert!(statements.iter().all(|s| s.invoice_ids.len() == 1));
}

#[tokio::test]
async fn overdue_statement_locks_the_account_once() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Eft).build();
    let mut cfs = CfsAccount::pending(account.id, PaymentMethod::Eft);
    cfs.provisioned("1", "2", "3").unwrap();
    harness.stores.put_cfs_account(cfs);
    harness.stores.put_account(account.clone());

    let today = Utc::now().date_naive();
    let mut settings = StatementSettings::new(
        account.id,
        StatementFrequency::Monthly,
        today - Duration::days(90),
    );
    settings.notification_enabled = true;
    settings.recipients = vec!["admin@example.com".to_string()];
    harness.stores.put_statement_settings(settings);

    // an unpaid approved invoice inside an overdue statement
    let invoice = TestInvoiceBuilder::new()
        .for_account(account.id)
        .with_method(PaymentMethod::Eft)
        .with_total(dec!(80.00))
        .build();
    let invoice_id = invoice.id;
    let period = StatementPeriod {
        from_date: today - Duration::days(61),
        to_date: today + Duration::days(1),
    };
    let mut built =
        generate_statements(account.id, StatementFrequency::Monthly, period, &[invoice.clone()], false);
    let mut statement = built.remove(0);
    statement.due_date = today - Duration::days(2);
    harness.stores.put_invoice(invoice);
    harness.stores.put_statement(statement);

    let ctx = common::job_ctx_with(&harness, test_clock(noon_utc(today)), JobSettings::default());
    let result = statement_due::run(&ctx).await;
    assert!(!result.has_failures());

    // invoice overdue, account frozen, lock event published once
    let overdue = harness.stores.invoice(invoice_id).unwrap();
    assert_eq!(overdue.status, InvoiceStatus::Overdue);
    assert_eq!(overdue.overdue_date, Some(today));
    assert_eq!(
        harness
            .stores
            .cfs_accounts_by_status_sync(CfsAccountStatus::Freeze)
            .len(),
        1
    );
    let locks = harness
        .events
        .count_matching(|e| matches!(e, LedgerEvent::AccountLocked { .. }));
    assert_eq!(locks, 1);
    let overdue_mails = harness
        .mailer
        .messages()
        .iter()
        .filter(|m| m.template == NotificationTemplate::StatementOverdue)
        .count();
    assert_eq!(overdue_mails, 1);

    // second run: already locked, nothing republished
    let result = statement_due::run(&ctx).await;
    assert!(!result.has_failures());
    let locks = harness
        .events
        .count_matching(|e| matches!(e, LedgerEvent::AccountLocked { .. }));
    assert_eq!(locks, 1);
}

#[tokio::test]
async fn reminder_and_due_notices_fire_on_their_days() {
    let harness = TestHarness::new();
    let account = TestAccountBuilder::new().with_method(PaymentMethod::Eft).build();
    harness.stores.put_account(account.clone());

    let today = Utc::now().date_naive();
    let mut settings = StatementSettings::new(
        account.id,
        StatementFrequency::Monthly,
        today - Duration::days(90),
    );
    settings.notification_enabled = true;
    settings.recipients = vec!["admin@example.com".to_string()];
    harness.stores.put_statement_settings(settings);

    let invoice = TestInvoiceBuilder::new()
        .for_account(account.id)
        .with_method(PaymentMethod::Eft)
        .build();
    let period = StatementPeriod {
        from_date: today - Duration::days(40),
        to_date: today,
    };
    let mut built = generate_statements(
        account.id,
        StatementFrequency::Monthly,
        period,
        &[invoice.clone()],
        false,
    );
    let mut statement = built.remove(0);
    statement.due_date = today + Duration::days(7);
    harness.stores.put_invoice(invoice);
    harness.stores.put_statement(statement);

    let ctx = common::job_ctx_with(&harness, test_clock(noon_utc(today)), JobSettings::default());
    let result = statement_due::run(&ctx).await;
    assert!(!result.has_failures());

    let reminders = harness
        .mailer
        .messages()
        .iter()
        .filter(|m| m.template == NotificationTemplate::StatementReminder)
        .count();
    assert_eq!(reminders, 1);
}
