//! Controllable time source
//!
//! Batch jobs never call `Utc::now()` directly; they read the clock from
//! their context so a `date_override` replay and a frozen-time test run the
//! exact same decision logic anchored to a different "now".

use chrono::{DateTime, TimeZone, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};

/// The clock handed to batch jobs and services
pub type Clock = SafeTimeProvider;

/// Creates a clock backed by system time
pub fn system_clock() -> Clock {
    SafeTimeProvider::new(TimeSource::System)
}

/// Creates a clock frozen at the given instant, controllable in tests
pub fn test_clock(start: DateTime<Utc>) -> Clock {
    SafeTimeProvider::new(TimeSource::Test(start))
}

/// Creates a test clock from calendar components
pub fn test_clock_at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> Clock {
    test_clock(Utc.with_ymd_and_hms(year, month, day, hour, min, 0).unwrap())
}
