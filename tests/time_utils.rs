//! Integration tests for time utilities.

use chrono::{NaiveDate, NaiveTime};
use iislens::util::time::{
    day_ceiling, day_floor, format_duration, format_table_timestamp, parse_clock_input,
    parse_date_input, parse_hour_minute, parse_log_timestamp,
};

#[test]
fn format_duration_seconds() {
    assert_eq!(format_duration(std::time::Duration::from_secs(5)), "5.0s");
}

#[test]
fn format_duration_minutes() {
    let s = format_duration(std::time::Duration::from_secs(90));
    assert!(s.contains("1.5m"), "Expected 1.5m, got: {s}");
}

#[test]
fn format_table_timestamp_has_expected_format() {
    let ts = parse_log_timestamp("2024-03-15", "14:30:45").unwrap();
    assert_eq!(format_table_timestamp(Some(&ts)), "2024-03-15 14:30:45");
    assert_eq!(format_table_timestamp(None), "");
}

#[test]
fn log_timestamp_rejects_partial_values() {
    assert!(parse_log_timestamp("2024-03-15", "").is_none());
    assert!(parse_log_timestamp("15/03/2024", "14:30:45").is_none());
    assert!(parse_log_timestamp("2024-03-15", "25:00:00").is_none());
}

#[test]
fn user_date_and_clock_input() {
    assert_eq!(parse_date_input(" 2024-01-31 "), NaiveDate::from_ymd_opt(2024, 1, 31));
    assert!(parse_date_input("2024-13-01").is_none());
    assert_eq!(parse_clock_input("07:05"), NaiveTime::from_hms_opt(7, 5, 0));
    assert_eq!(parse_clock_input("07:05:09"), NaiveTime::from_hms_opt(7, 5, 9));
    assert!(parse_clock_input("7pm").is_none());
}

#[test]
fn hour_minute_fields_are_range_checked() {
    assert_eq!(parse_hour_minute("23", "59"), NaiveTime::from_hms_opt(23, 59, 0));
    assert_eq!(parse_hour_minute("0", "0"), NaiveTime::from_hms_opt(0, 0, 0));
    assert!(parse_hour_minute("24", "00").is_none());
    assert!(parse_hour_minute("12", "60").is_none());
    assert!(parse_hour_minute("-1", "10").is_none());
    assert!(parse_hour_minute("ab", "10").is_none());
}

#[test]
fn day_bounds() {
    assert_eq!(day_floor(), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    assert_eq!(day_ceiling(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
}
