//! Job settings
//!
//! Loaded once per host process from environment (a `.env` file is
//! honored) with `JOBS_` prefixed keys, e.g. `JOBS_PAD_CONFIRMATION_DAYS`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use core_kernel::Timezone;

/// Tunable knobs for the batch jobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Days a first-time PAD account waits before activation
    pub pad_confirmation_days: i64,
    /// Cooldown after settlement before an invoice is disbursement-eligible
    pub disbursement_delay_days: i64,
    /// Local hour of day the invoice-creation batching cuts off at
    pub invoice_cutoff_hour: u32,
    /// Days before the due date the reminder notice goes out
    pub reminder_days_before_due: i64,
    /// Fee assessed when a routing slip goes NSF
    pub nsf_fee: Decimal,
    /// Operating timezone for day-boundary decisions
    pub timezone: Timezone,
    /// Operator addresses for end-of-run failure notifications
    pub operator_emails: Vec<String>,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            pad_confirmation_days: 3,
            disbursement_delay_days: 5,
            invoice_cutoff_hour: 0,
            reminder_days_before_due: 7,
            nsf_fee: dec!(30.00),
            timezone: Timezone::pacific(),
            operator_emails: Vec::new(),
        }
    }
}

impl JobSettings {
    /// Loads settings from the environment, tolerating a missing `.env`
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        config::Config::builder()
            .add_source(config::Environment::with_prefix("JOBS").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
