//! Canonical data structure for a single IIS access log line.
//!
//! Every data line is decoded into this struct by the parser. Fields that
//! are missing from the active `#Fields:` layout, or that fail to parse,
//! hold their zero value instead of failing the record.

use chrono::NaiveDateTime;

/// Represents a single parsed W3C extended log entry.
///
/// Immutable once built. `Clone` (for exporting a filtered view) and
/// `serde::Serialize` (for JSON export).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LogRecord {
    /// Request time in UTC, from the `date` and `time` columns. `None` when
    /// either column is missing or does not match `YYYY-MM-DD HH:MM:SS`.
    /// `None` orders before every real timestamp.
    pub timestamp: Option<NaiveDateTime>,

    /// HTTP verb (`cs-method`), e.g. `"GET"`.
    pub method: String,

    /// Requested path (`cs-uri-stem`).
    pub uri_stem: String,

    /// Query string (`cs-uri-query`). IIS writes `-` when there is none.
    pub uri_query: String,

    /// Server port (`s-port`).
    pub port: i32,

    /// Authenticated user (`cs-username`).
    pub username: String,

    /// Client address (`c-ip`).
    pub client_ip: String,

    /// User agent (`cs(User-Agent)`) with `+` decoded to spaces.
    pub user_agent: String,

    /// HTTP status (`sc-status`). Kept as written, so an out-of-range
    /// value such as `70000` still counts as an error.
    pub status_code: i32,

    /// IIS sub-status (`sc-substatus`).
    pub sub_status: i32,

    /// Time taken in milliseconds (`time-taken`).
    pub time_taken_ms: i32,

    /// Bytes sent to the client (`sc-bytes`).
    pub bytes_sent: i64,
}

/// Coarse HTTP status family used for the status breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Success,
    Redirect,
    ClientError,
    ServerError,
    Other,
}

impl StatusClass {
    /// Classify a raw status code.
    pub fn of(status: i32) -> Self {
        match status {
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirect,
            400..=499 => StatusClass::ClientError,
            500..=599 => StatusClass::ServerError,
            _ => StatusClass::Other,
        }
    }

    /// Short label for tables and text reports.
    pub fn label(self) -> &'static str {
        match self {
            StatusClass::Success => "OK",
            StatusClass::Redirect => "Redirect",
            StatusClass::ClientError => "Client error",
            StatusClass::ServerError => "Server error",
            StatusClass::Other => "Unknown",
        }
    }
}

impl LogRecord {
    /// `true` for any status of 400 or above.
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }

    /// Time taken in seconds.
    pub fn time_taken_seconds(&self) -> f64 {
        self.time_taken_ms as f64 / 1000.0
    }

    pub fn status_class(&self) -> StatusClass {
        StatusClass::of(self.status_code)
    }

    /// Heuristic match for OAuth-style token requests: a `/token` path
    /// segment or a `token` query parameter, ignoring case.
    pub fn is_token_request(&self) -> bool {
        use crate::util::constants::{TOKEN_QUERY_MARKER, TOKEN_STEM_MARKER};
        contains_ignore_case(&self.uri_stem, TOKEN_STEM_MARKER)
            || contains_ignore_case(&self.uri_query, TOKEN_QUERY_MARKER)
    }
}

/// Case-insensitive substring test. `needle_lower` must already be lowercase.
pub(crate) fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    if haystack.is_ascii() && needle_lower.is_ascii() {
        haystack
            .as_bytes()
            .windows(needle_lower.len())
            .any(|w| w.eq_ignore_ascii_case(needle_lower.as_bytes()))
    } else {
        haystack.to_lowercase().contains(needle_lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: i32, stem: &str, query: &str) -> LogRecord {
        LogRecord {
            status_code: status,
            uri_stem: stem.into(),
            uri_query: query.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_error_boundary() {
        assert!(!record(399, "/", "-").is_error());
        assert!(record(400, "/", "-").is_error());
        assert!(record(503, "/", "-").is_error());
    }

    #[test]
    fn test_time_taken_seconds() {
        let r = LogRecord {
            time_taken_ms: 1500,
            ..Default::default()
        };
        assert!((r.time_taken_seconds() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_status_class() {
        assert_eq!(StatusClass::of(204), StatusClass::Success);
        assert_eq!(StatusClass::of(302), StatusClass::Redirect);
        assert_eq!(StatusClass::of(404), StatusClass::ClientError);
        assert_eq!(StatusClass::of(500), StatusClass::ServerError);
        assert_eq!(StatusClass::of(0), StatusClass::Other);
        assert_eq!(record(503, "/", "").status_class().label(), "Server error");
        assert_eq!(StatusClass::of(-1).label(), "Unknown");
    }

    #[test]
    fn test_token_request_detection() {
        assert!(record(200, "/connect/TOKEN", "-").is_token_request());
        assert!(record(200, "/api", "grant=refresh_Token").is_token_request());
        // Substring match, so a longer segment still counts.
        assert!(record(200, "/tokens", "-").is_token_request());
        assert!(!record(200, "/api/users", "id=7").is_token_request());
    }

    #[test]
    fn test_contains_ignore_case_non_ascii() {
        assert!(contains_ignore_case("/ÜBER/Token", "/token"));
        assert!(!contains_ignore_case("/über", "/token"));
    }
}
