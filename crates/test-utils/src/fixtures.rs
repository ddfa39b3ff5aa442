//! Common fixtures for plume extraction tests.

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// A fixed analysis date for tests (2020-06-15).
pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 6, 15).expect("valid fixture date")
}

/// Midnight of `date`.
pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight is valid")
}

/// `count` timestamps starting at `start`, `step_hours` apart.
pub fn hourly_times(start: NaiveDateTime, step_hours: i64, count: usize) -> Vec<NaiveDateTime> {
    (0..count)
        .map(|k| start + Duration::hours(step_hours * k as i64))
        .collect()
}
