//! Validates that compile-time constants are internally consistent.
#![allow(clippy::assertions_on_constants)]

use iislens::util::constants::*;

#[test]
fn batch_size_is_positive() {
    assert!(PARSE_BATCH_SIZE > 0, "PARSE_BATCH_SIZE must be > 0");
}

#[test]
fn channel_bound_is_positive() {
    assert!(CHANNEL_BOUND > 0, "CHANNEL_BOUND must be > 0");
}

#[test]
fn cancel_interval_is_reasonable() {
    assert!(CANCEL_CHECK_INTERVAL > 0);
    assert!(
        CANCEL_CHECK_INTERVAL <= 65_536,
        "Cancellation would be noticed too late"
    );
}

#[test]
fn directive_is_a_comment() {
    assert!(FIELDS_DIRECTIVE.starts_with(COMMENT_PREFIX));
    assert!(FIELDS_DIRECTIVE.ends_with(':'));
}

#[test]
fn end_of_day_is_a_valid_clock() {
    let (h, m, s) = END_OF_DAY;
    assert!(chrono::NaiveTime::from_hms_opt(h, m, s).is_some());
    assert_eq!((h, m), (23, 59));
}

#[test]
fn app_metadata_is_populated() {
    assert!(!APP_NAME.is_empty(), "APP_NAME must not be empty");
    assert!(!APP_VERSION.is_empty(), "APP_VERSION must not be empty");
    assert!(LOG_FILE_NAME.ends_with(".log"));
    assert!(MAX_LOG_FILE_SIZE >= 1024 * 1024);
}
