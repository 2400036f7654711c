//! Per-invocation job results
//!
//! Each run owns its accumulator; nothing is process-wide, so concurrent
//! or overlapping invocations cannot leak errors into each other.

use serde_json::json;
use tracing::{info, warn};

use domain_payment::{EmailMessage, NotificationTemplate};

use crate::context::JobContext;

/// One failed row
#[derive(Debug, Clone)]
pub struct RowFailure {
    pub row: String,
    pub error: String,
}

/// Aggregate outcome of one job invocation
#[derive(Debug)]
pub struct JobRunResult {
    pub job: &'static str,
    pub processed: usize,
    pub skipped: usize,
    pub failures: Vec<RowFailure>,
}

impl JobRunResult {
    pub fn new(job: &'static str) -> Self {
        Self {
            job,
            processed: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_processed(&mut self) {
        self.processed += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, row: impl Into<String>, error: impl ToString) {
        self.failures.push(RowFailure {
            row: row.into(),
            error: error.to_string(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Logs the run summary and sends the single end-of-run failure
    /// notification when anything failed
    pub async fn finish(self, ctx: &JobContext) -> Self {
        info!(
            job = self.job,
            processed = self.processed,
            skipped = self.skipped,
            failures = self.failures.len(),
            "job run finished"
        );
        if self.has_failures() && !ctx.settings.operator_emails.is_empty() {
            let message = EmailMessage {
                template: NotificationTemplate::JobFailure,
                recipients: ctx.settings.operator_emails.clone(),
                params: json!({
                    "job": self.job,
                    "failures": self.failures.iter().map(|f| json!({
                        "row": f.row,
                        "error": f.error,
                    })).collect::<Vec<_>>(),
                }),
            };
            if let Err(err) = ctx.payment.mailer.send(message).await {
                warn!(job = self.job, error = %err, "job failure mail send failed");
            }
        }
        self
    }
}
