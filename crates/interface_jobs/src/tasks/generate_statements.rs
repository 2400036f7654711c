//! Statement generation
//!
//! Runs daily; for each account it emits statements for every cycle that
//! has closed since the last generated statement (gap filling covers
//! scheduler outages). Each emitted statement carries invoices of exactly
//! one payment method.

use tracing::info;

use domain_ledger::InvoiceStatus;
use domain_statement::{generate_statements as build, missing_periods};

use crate::context::JobContext;
use crate::result::JobRunResult;

const STATEMENT_STATUSES: [InvoiceStatus; 9] = [
    InvoiceStatus::Created,
    InvoiceStatus::Approved,
    InvoiceStatus::SettlementScheduled,
    InvoiceStatus::Paid,
    InvoiceStatus::Partial,
    InvoiceStatus::Overdue,
    InvoiceStatus::RefundRequested,
    InvoiceStatus::Refunded,
    InvoiceStatus::Credited,
];

pub async fn run(ctx: &JobContext) -> JobRunResult {
    let mut result = JobRunResult::new("GENERATE_STATEMENTS");
    let today = ctx.today();

    let accounts = match ctx.payment.accounts.accounts_by_method(None).await {
        Ok(rows) => rows,
        Err(err) => {
            result.record_failure("query", err);
            return result.finish(ctx).await;
        }
    };

    for account in accounts {
        if ctx.skips_account(account.id) {
            result.record_skipped();
            continue;
        }
        let settings = match ctx.statements.settings_on(account.id, today).await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                result.record_skipped();
                continue;
            }
            Err(err) => {
                result.record_failure(account.id.to_string(), err);
                continue;
            }
        };

        let last_end = match ctx.statements.latest_statement_end(account.id).await {
            Ok(last_end) => last_end,
            Err(err) => {
                result.record_failure(account.id.to_string(), err);
                continue;
            }
        };

        let mut periods = missing_periods(settings.frequency, last_end, today);
        // a period already covered by the latest statement is done
        periods.retain(|p| last_end.map_or(true, |end| p.to_date > end));
        if periods.is_empty() {
            result.record_skipped();
            continue;
        }

        let invoices = match ctx
            .payment
            .ledger
            .account_invoices_by_status(account.id, &STATEMENT_STATUSES)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                result.record_failure(account.id.to_string(), err);
                continue;
            }
        };

        for period in periods {
            let statements = build(account.id, settings.frequency, period, &invoices, false);
            info!(
                account_id = %account.id,
                from = %period.from_date,
                to = %period.to_date,
                statements = statements.len(),
                "statements generated"
            );
            for statement in statements {
                match ctx.statements.save_statement(&statement).await {
                    Ok(()) => result.record_processed(),
                    Err(err) => result.record_failure(statement.id.to_string(), err),
                }
            }
        }
    }

    result.finish(ctx).await
}
