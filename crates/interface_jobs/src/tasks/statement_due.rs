//! Statement due / overdue handling
//!
//! Walks statements approaching or past their due date for the deferred
//! settlement methods. Sends reminder, due and overdue notices keyed off
//! the day offset; on the overdue path it transitions the statement's
//! unpaid APPROVED invoices to OVERDUE, records an activity entry per
//! newly-overdue invoice, and locks the account exactly once per overdue
//! episode - a rerun against an already-frozen account republishes
//! nothing.

use serde_json::json;
use tracing::info;

use domain_account::CfsAccountStatus;
use domain_ledger::{InvoiceStatus, PaymentMethod};
use domain_payment::{EmailMessage, LedgerEvent, NotificationTemplate};
use domain_statement::Statement;

use crate::context::JobContext;
use crate::result::JobRunResult;

const DUE_METHODS: [PaymentMethod; 3] = [
    PaymentMethod::Eft,
    PaymentMethod::Pad,
    PaymentMethod::OnlineBanking,
];

pub async fn run(ctx: &JobContext) -> JobRunResult {
    let mut result = JobRunResult::new("STATEMENT_DUE");
    let today = ctx.today();
    let horizon = today + chrono::Duration::days(ctx.settings.reminder_days_before_due);

    let statements = match ctx.statements.statements_due_by(horizon).await {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure("query", err);
            return result.finish(ctx).await;
        }
    };
    info!(count = statements.len(), "statements in the due window");

    for statement in statements {
        if ctx.skips_account(statement.account_id) {
            result.record_skipped();
            continue;
        }
        if !DUE_METHODS.contains(&statement.payment_method) {
            result.record_skipped();
            continue;
        }

        let reminder_day = statement.due_date - chrono::Duration::days(ctx.settings.reminder_days_before_due);
        if today == reminder_day {
            notify(ctx, &statement, NotificationTemplate::StatementReminder).await;
            result.record_processed();
        } else if today == statement.due_date {
            notify(ctx, &statement, NotificationTemplate::StatementDue).await;
            result.record_processed();
        } else if today > statement.due_date {
            match handle_overdue(ctx, &statement).await {
                Ok(newly_overdue) => {
                    if newly_overdue > 0 {
                        notify(ctx, &statement, NotificationTemplate::StatementOverdue).await;
                    }
                    result.record_processed();
                }
                Err(err) => result.record_failure(statement.id.to_string(), err),
            }
        } else {
            result.record_skipped();
        }
    }

    result.finish(ctx).await
}

/// Overdue transition + single lock per episode
async fn handle_overdue(ctx: &JobContext, statement: &Statement) -> Result<usize, String> {
    let today = ctx.today();
    let unpaid = ctx
        .payment
        .ledger
        .account_invoices_by_status(statement.account_id, &[InvoiceStatus::Approved])
        .await
        .map_err(|e| e.to_string())?;

    let mut newly_overdue = 0usize;
    for mut invoice in unpaid {
        if !statement.contains(invoice.id) {
            continue;
        }
        invoice
            .transition_to(InvoiceStatus::Overdue)
            .map_err(|e| e.to_string())?;
        invoice.overdue_date = Some(today);
        match ctx.payment.ledger.save_invoice(&invoice).await {
            Ok(()) => {
                newly_overdue += 1;
                // ledger trace for each invoice entering the overdue pool
                let _ = ctx
                    .payment
                    .events
                    .publish(LedgerEvent::ActivityLog {
                        account_id: invoice.account_id,
                        action: format!("invoice {} overdue", invoice.id),
                    })
                    .await;
            }
            Err(err) if err.is_conflict() => continue,
            Err(err) => return Err(err.to_string()),
        }
    }

    // lock once per episode: an already-frozen account republishes nothing
    if let Some(mut cfs) = ctx
        .payment
        .accounts
        .effective_cfs_account(statement.account_id)
        .await
        .map_err(|e| e.to_string())?
    {
        if cfs.status == CfsAccountStatus::Active {
            cfs.transition_to(CfsAccountStatus::Freeze)
                .map_err(|e| e.to_string())?;
            ctx.payment
                .accounts
                .save_cfs_account(&cfs)
                .await
                .map_err(|e| e.to_string())?;
            let _ = ctx
                .payment
                .events
                .publish(LedgerEvent::AccountLocked {
                    account_id: statement.account_id,
                    reason: "statement overdue".to_string(),
                })
                .await;
        }
    }

    Ok(newly_overdue)
}

async fn notify(ctx: &JobContext, statement: &Statement, template: NotificationTemplate) {
    let settings = match ctx
        .statements
        .settings_on(statement.account_id, ctx.today())
        .await
    {
        Ok(Some(settings)) => settings,
        _ => return,
    };
    if !settings.notification_enabled || settings.recipients.is_empty() {
        return;
    }
    let message = EmailMessage {
        template,
        recipients: settings.recipients,
        params: json!({
            "statementFrom": statement.from_date,
            "statementTo": statement.to_date,
            "dueDate": statement.due_date,
        }),
    };
    let _ = ctx.payment.mailer.send(message).await;
}
