//! Shared wiring for job tests

use std::sync::Arc;

use chrono::{DateTime, Utc};

use core_kernel::clock::{test_clock, Clock};
use interface_jobs::context::{JobContext, JobOverrides};
use interface_jobs::JobSettings;
use test_utils::TestHarness;

/// Builds a job context over the harness, frozen at the given instant
pub fn job_ctx(harness: &TestHarness, now: DateTime<Utc>) -> JobContext {
    job_ctx_with(harness, test_clock(now), JobSettings::default())
}

pub fn job_ctx_with(harness: &TestHarness, clock: Clock, settings: JobSettings) -> JobContext {
    JobContext {
        payment: harness.ctx.clone(),
        statements: harness.stores.clone(),
        clock: Arc::new(clock),
        settings,
        overrides: JobOverrides::default(),
    }
}
