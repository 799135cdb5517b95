//! Timestamp parsing and formatting helpers for IISLens.
//!
//! IIS writes timestamps in UTC without an offset, so everything here works
//! on naive values and never converts to local time.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::util::constants::{END_OF_DAY, LOG_TIMESTAMP_FORMAT};

/// Format a record timestamp for table/CSV output as `YYYY-MM-DD HH:MM:SS`.
///
/// Records whose timestamp could not be parsed render as an empty string.
pub fn format_table_timestamp(ts: Option<&NaiveDateTime>) -> String {
    ts.map(|t| t.format(LOG_TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// Format a `std::time::Duration` into a human-readable string.
///
/// Examples: `0.3ms`, `1.2s`, `1.5m`.
pub fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 0.01 {
        format!("{:.1}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let mins = secs / 60.0;
        format!("{mins:.1}m")
    }
}

/// Combine the `date` and `time` columns of a data line.
///
/// Both parts must be present and together match `YYYY-MM-DD HH:MM:SS`
/// exactly; anything else yields `None`.
pub fn parse_log_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    if date.is_empty() || time.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), LOG_TIMESTAMP_FORMAT).ok()
}

/// Parse a calendar date typed by the user (`YYYY-MM-DD`).
pub fn parse_date_input(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()
}

/// Parse a time of day typed by the user. Accepts `HH:MM` and `HH:MM:SS`.
pub fn parse_clock_input(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    NaiveTime::parse_from_str(input, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
        .ok()
}

/// Parse separate hour and minute text fields into a time of day.
///
/// Returns `None` unless the hour is 0-23 and the minute 0-59, so callers
/// can keep the previous value while the user is still typing.
pub fn parse_hour_minute(hour: &str, minute: &str) -> Option<NaiveTime> {
    let h: u32 = hour.trim().parse().ok()?;
    let m: u32 = minute.trim().parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    NaiveTime::from_hms_opt(h, m, 0)
}

/// Start of a calendar day.
pub fn day_floor() -> NaiveTime {
    NaiveTime::default()
}

/// Last whole second of a calendar day (`23:59:59`).
pub fn day_ceiling() -> NaiveTime {
    let (h, m, s) = END_OF_DAY;
    NaiveTime::from_hms_opt(h, m, s).unwrap_or_default()
}
