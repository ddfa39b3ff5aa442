//! Time handling: analysis windows, CF time decoding and strftime templates.

use std::fmt::Write as _;
use std::ops::Range;

use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{PlumeError, PlumeResult};

/// Closed time interval `[start, end]` selected for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl AnalysisWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Build the window from optional date parts.
    ///
    /// Missing parts are taken from the day before `today`. The window starts
    /// at midnight and spans `hours`. `today` is passed in so callers control
    /// the clock.
    pub fn resolve(
        year: Option<i32>,
        month: Option<u32>,
        day: Option<u32>,
        hours: i64,
        today: NaiveDate,
    ) -> PlumeResult<Self> {
        let yesterday = today
            .pred_opt()
            .ok_or_else(|| PlumeError::invalid_parameter("date", "no day before today"))?;
        let year = year.unwrap_or(yesterday.year());
        let month = month.unwrap_or(yesterday.month());
        let day = day.unwrap_or(yesterday.day());

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            PlumeError::invalid_parameter(
                "date",
                format!("{:04}-{:02}-{:02} is not a valid date", year, month, day),
            )
        })?;
        if hours < 0 {
            return Err(PlumeError::invalid_parameter(
                "time_window",
                format!("window must not be negative, got {} hours", hours),
            ));
        }

        let start = date.and_time(NaiveTime::MIN);
        Ok(Self {
            start,
            end: start + Duration::hours(hours),
        })
    }

    /// Whether `t` falls inside the closed window.
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        t >= self.start && t <= self.end
    }

    /// Index range a reader should fetch from a time axis.
    ///
    /// Spans the first to the last sample inside the window, so samples
    /// outside it are never requested. An axis with at most one sample is
    /// read whole, since a single sample is used whatever its timestamp.
    /// Returns an empty range when no sample falls inside.
    pub fn index_range(&self, times: &[NaiveDateTime]) -> Range<usize> {
        if times.len() <= 1 {
            return 0..times.len();
        }
        let first = times.iter().position(|t| self.contains(*t));
        let last = times.iter().rposition(|t| self.contains(*t));
        match (first, last) {
            (Some(first), Some(last)) => first..last + 1,
            _ => 0..0,
        }
    }
}

/// Mean of a set of timestamps, computed as `min + mean(t - min)`.
pub fn mean_timestamp(times: &[NaiveDateTime]) -> Option<NaiveDateTime> {
    let min = *times.iter().min()?;
    let total_ms: i128 = times
        .iter()
        .map(|t| (*t - min).num_milliseconds() as i128)
        .sum();
    let mean_ms = total_ms / times.len() as i128;
    Some(min + Duration::milliseconds(mean_ms as i64))
}

/// Resolve strftime tokens (`%Y`, `%m`, ...) in `template` against `t`.
///
/// Invalid format specifiers are reported instead of panicking.
pub fn format_template(template: &str, t: NaiveDateTime) -> PlumeResult<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(template).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(PlumeError::invalid_parameter(
            "template",
            format!("invalid strftime pattern '{}'", template),
        ));
    }
    let mut out = String::with_capacity(template.len() + 8);
    write!(out, "{}", t.format_with_items(items.into_iter())).map_err(|_| {
        PlumeError::invalid_parameter("template", format!("cannot format '{}'", template))
    })?;
    Ok(out)
}

/// CF-convention time units: `<unit> since <reference>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    /// Seconds per unit step.
    pub step_seconds: f64,
    pub reference: NaiveDateTime,
}

impl CfTimeUnits {
    /// Parse a units attribute such as `hours since 2020-01-01 00:00:00` or
    /// `days since 1-1-1 00:00:0.0`.
    pub fn parse(units: &str) -> PlumeResult<Self> {
        let invalid = |msg: &str| {
            PlumeError::invalid_parameter("time.units", format!("{}: '{}'", msg, units))
        };

        let lower = units.trim().to_lowercase();
        let (unit, reference) = lower
            .split_once(" since ")
            .ok_or_else(|| invalid("expected '<unit> since <date>'"))?;

        let step_seconds = match unit.trim() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
            "days" | "day" | "d" => 86400.0,
            _ => return Err(invalid("unsupported time unit")),
        };

        let reference = parse_reference(reference.trim()).ok_or_else(|| invalid("bad reference date"))?;
        Ok(Self {
            step_seconds,
            reference,
        })
    }

    /// Convert an offset in units to a timestamp, rounded to milliseconds.
    ///
    /// Offsets that are not finite or land outside the representable date
    /// range (fill values, corrupt axes) are reported as `InvalidFormat`.
    pub fn to_datetime(&self, value: f64) -> PlumeResult<NaiveDateTime> {
        let out_of_range = || PlumeError::InvalidFormat {
            source_name: "time".to_string(),
            message: format!("offset {} is out of range", value),
        };

        let ms = (value * self.step_seconds * 1000.0).round();
        if !ms.is_finite() || ms < i64::MIN as f64 || ms > i64::MAX as f64 {
            return Err(out_of_range());
        }
        let delta = Duration::try_milliseconds(ms as i64).ok_or_else(out_of_range)?;
        self.reference
            .checked_add_signed(delta)
            .ok_or_else(out_of_range)
    }
}

fn parse_reference(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim_end_matches(|c: char| c == 'z' || c.is_whitespace());
    let s = s.strip_suffix("utc").unwrap_or(s).trim();
    let (date_part, time_part) = match s.split_once(|c: char| c == 't' || c == ' ') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (s, None),
    };

    let mut date_fields = date_part.split('-').map(|p| p.parse::<i64>().ok());
    let year = date_fields.next()??;
    let month = date_fields.next().unwrap_or(Some(1))?;
    let day = date_fields.next().unwrap_or(Some(1))?;
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)?;

    let mut seconds = 0.0f64;
    if let Some(time_part) = time_part.filter(|t| !t.is_empty()) {
        let mut parts = time_part.split(':');
        let h: f64 = parts.next()?.parse().ok()?;
        let m: f64 = parts.next().map(|p| p.parse().ok()).unwrap_or(Some(0.0))?;
        let sec: f64 = parts.next().map(|p| p.parse().ok()).unwrap_or(Some(0.0))?;
        seconds = h * 3600.0 + m * 60.0 + sec;
    }

    Some(date.and_time(NaiveTime::MIN) + Duration::milliseconds((seconds * 1000.0).round() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_resolve_defaults_to_yesterday() {
        let today = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let window = AnalysisWindow::resolve(None, None, None, 24, today).unwrap();
        assert_eq!(window.start, dt(2020, 2, 29, 0));
        assert_eq!(window.end, dt(2020, 3, 1, 0));
    }

    #[test]
    fn test_resolve_explicit_parts() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let window = AnalysisWindow::resolve(Some(2020), Some(1), Some(1), 6, today).unwrap();
        assert_eq!(window.start, dt(2020, 1, 1, 0));
        assert_eq!(window.end, dt(2020, 1, 1, 6));
        assert!(window.contains(dt(2020, 1, 1, 6)));
        assert!(!window.contains(dt(2020, 1, 1, 7)));
    }

    #[test]
    fn test_resolve_invalid_date() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert!(AnalysisWindow::resolve(Some(2021), Some(2), Some(30), 24, today).is_err());
        assert!(AnalysisWindow::resolve(None, None, None, -1, today).is_err());
    }

    #[test]
    fn test_mean_timestamp() {
        let times = [dt(2020, 1, 1, 0), dt(2020, 1, 1, 1), dt(2020, 1, 1, 5)];
        assert_eq!(mean_timestamp(&times), Some(dt(2020, 1, 1, 2)));
        assert_eq!(mean_timestamp(&[]), None);
    }

    #[test]
    fn test_format_template() {
        let t = dt(2020, 1, 2, 12);
        assert_eq!(format_template("pm25_%Y%m%d.geojson", t).unwrap(), "pm25_20200102.geojson");
        assert_eq!(format_template("plain.png", t).unwrap(), "plain.png");
        assert!(format_template("bad_%Q%", t).is_err());
    }

    #[test]
    fn test_cf_units() {
        let units = CfTimeUnits::parse("hours since 2020-01-01 00:00:00").unwrap();
        assert_eq!(units.to_datetime(30.0).unwrap(), dt(2020, 1, 2, 6));

        let units = CfTimeUnits::parse("days since 2000-01-01T00:00:00Z").unwrap();
        assert_eq!(units.to_datetime(0.5).unwrap(), dt(2000, 1, 1, 12));

        let units = CfTimeUnits::parse("minutes since 2019-12-31").unwrap();
        assert_eq!(units.to_datetime(60.0).unwrap(), dt(2019, 12, 31, 1));

        let units = CfTimeUnits::parse("days since 1-1-1 00:00:0.0").unwrap();
        assert_eq!(units.reference, dt(1, 1, 1, 0));

        assert!(CfTimeUnits::parse("fortnights since 2020-01-01").is_err());
        assert!(CfTimeUnits::parse("2020-01-01").is_err());
    }

    #[test]
    fn test_cf_offset_out_of_range() {
        let units = CfTimeUnits::parse("days since 2020-01-01").unwrap();
        for value in [1e30, -1e30, 9.96921e36, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                units.to_datetime(value),
                Err(PlumeError::InvalidFormat { .. })
            ));
        }
        // past NaiveDateTime::MAX but small enough for i64 milliseconds
        assert!(units.to_datetime(1e8).is_err());
    }

    #[test]
    fn test_index_range() {
        let times: Vec<_> = (0..6).map(|h| dt(2020, 1, 1, h * 4)).collect();
        let window = AnalysisWindow::new(dt(2020, 1, 1, 3), dt(2020, 1, 1, 12));
        assert_eq!(window.index_range(&times), 1..4);

        let later = AnalysisWindow::new(dt(2020, 1, 2, 0), dt(2020, 1, 3, 0));
        assert_eq!(later.index_range(&times), 0..0);

        // single samples are always read
        assert_eq!(later.index_range(&times[..1]), 0..1);
        assert_eq!(later.index_range(&[]), 0..0);
    }
}
