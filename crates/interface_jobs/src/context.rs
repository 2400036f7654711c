//! Per-invocation job context

use chrono::{DateTime, NaiveDate, Utc};

use core_kernel::clock::Clock;
use core_kernel::AccountId;
use domain_payment::PaymentContext;
use domain_statement::StatementStore;
use std::sync::Arc;

use crate::config::JobSettings;

/// Operational overrides for backfill and replay
///
/// Overrides re-anchor "now" or narrow the eligible row set; they never
/// bypass a job's precondition-status checks, so already-advanced rows are
/// never re-processed.
#[derive(Debug, Clone, Default)]
pub struct JobOverrides {
    /// Run as if today were this local date
    pub date_override: Option<NaiveDate>,
    /// Process only this account's rows
    pub account_override: Option<AccountId>,
}

/// Everything a job invocation operates with
///
/// Carries no mutable state of its own; all reads and writes go through
/// the ports.
#[derive(Clone)]
pub struct JobContext {
    pub payment: PaymentContext,
    pub statements: Arc<dyn StatementStore>,
    pub clock: Arc<Clock>,
    pub settings: JobSettings,
    pub overrides: JobOverrides,
}

impl JobContext {
    /// The instant this run is anchored to
    ///
    /// With a `date_override`, that date at the configured cutoff hour in
    /// the operating timezone; otherwise the clock's now.
    pub fn now(&self) -> DateTime<Utc> {
        match self.overrides.date_override {
            Some(date) => {
                let start = self.settings.timezone.start_of_day(date);
                start + chrono::Duration::hours(self.settings.invoice_cutoff_hour as i64)
            }
            None => self.clock.now(),
        }
    }

    /// The local calendar date this run is anchored to
    pub fn today(&self) -> NaiveDate {
        self.overrides
            .date_override
            .unwrap_or_else(|| self.settings.timezone.local_date(self.clock.now()))
    }

    /// True when an account override excludes this account
    pub fn skips_account(&self, account_id: AccountId) -> bool {
        self.overrides
            .account_override
            .map_or(false, |only| only != account_id)
    }
}
