//! Reconciliation / Disbursement batch jobs
//!
//! Idempotent, re-entrant scheduled procedures. Every job follows the same
//! shape: query rows in a precondition status, process each row in its own
//! transaction scope, advance the status last. A failure on one row never
//! aborts work already committed for earlier rows; failures aggregate into
//! the per-invocation [`JobRunResult`] and produce a single end-of-run
//! operator notification.
//!
//! Jobs read "now" from the [`JobContext`] clock, so a `date_override`
//! replay runs the exact same decision logic anchored to a different day.
//! The host process (cron wrapper) wires the adapters, loads
//! [`JobSettings`], initializes tracing and dispatches by task name via
//! [`run_named_task`].

pub mod config;
pub mod context;
pub mod result;
pub mod flows;
pub mod tasks;

use crate::context::JobContext;
use crate::result::JobRunResult;

pub use config::JobSettings;
pub use context::JobOverrides;

/// Initializes JSON tracing for a job host process
///
/// Filter comes from `RUST_LOG`, defaulting to info.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

/// Dispatches a scheduler-named task
///
/// Unknown names return an empty failed result rather than panicking so a
/// typo'd cron entry surfaces in monitoring.
pub async fn run_named_task(name: &str, ctx: &JobContext) -> JobRunResult {
    match name {
        "CREATE_ACCOUNTS" => tasks::create_accounts::run(ctx).await,
        "ACTIVATE_PAD_ACCOUNTS" => tasks::activate_pad::run(ctx).await,
        "CREATE_INVOICES" => tasks::create_invoices::run(ctx).await,
        "REFUND_CONFIRMATION" => tasks::refund_confirmation::run(ctx).await,
        "EJV_DISBURSEMENT" => tasks::ejv_disbursement::run(ctx).await,
        "APPLY_EFT_CREDITS" => tasks::apply_eft_credits::run(ctx).await,
        "GENERATE_STATEMENTS" => tasks::generate_statements::run(ctx).await,
        "STATEMENT_DUE" => tasks::statement_due::run(ctx).await,
        "ROUTING_SLIP_NSF" => tasks::routing_slip_nsf::run(ctx).await,
        other => {
            let mut result = JobRunResult::new("UNKNOWN");
            result.record_failure(other, "unknown task name");
            result
        }
    }
}
