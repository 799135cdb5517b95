//! In-memory record predicate.
//!
//! [`RecordFilter`] is compiled once from a [`FilterCriteria`] snapshot:
//! the search text is lowered, a status search is parsed, and the date
//! bounds are resolved. [`RecordFilter::matches`] then runs per record
//! with no allocation on the ASCII fast path.

use chrono::NaiveDateTime;

use crate::core::criteria::{FilterCriteria, SearchType};
use crate::core::log_record::{contains_ignore_case, LogRecord};

/// Pre-resolved form of the search clause.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchClause {
    /// Blank text, or a status search whose text is not a number.
    None,
    /// Lowercased needle matched against stem or query.
    Url(String),
    /// Lowercased needle matched against the client IP.
    Ip(String),
    /// Exact method, compared ignoring case.
    Method(String),
    /// Exact status code.
    Status(i64),
}

/// Compiled predicate over [`LogRecord`]s. All active clauses are
/// AND-combined; unset clauses always pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    errors_only: bool,
    search: SearchClause,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl RecordFilter {
    pub fn new(criteria: &FilterCriteria) -> Self {
        let search = match criteria.active_search() {
            None => SearchClause::None,
            Some(text) => match criteria.search_type {
                SearchType::Url => SearchClause::Url(text.to_lowercase()),
                SearchType::Ip => SearchClause::Ip(text.to_lowercase()),
                SearchType::Method => SearchClause::Method(text.to_owned()),
                SearchType::Status => text
                    .trim()
                    .parse::<i64>()
                    .map(SearchClause::Status)
                    .unwrap_or(SearchClause::None),
            },
        };

        Self {
            errors_only: criteria.show_errors_only,
            search,
            start: criteria.start_bound(),
            end: criteria.end_bound(),
        }
    }

    /// Test whether `record` passes **all** active clauses.
    ///
    /// Checks are ordered cheapest-first for short-circuit efficiency:
    /// 1. Error-only flag
    /// 2. Time bounds
    /// 3. Search text
    pub fn matches(&self, record: &LogRecord) -> bool {
        if self.errors_only && !record.is_error() {
            return false;
        }

        // An unparsed timestamp sorts before any real bound, so it fails a
        // start bound and passes an end bound.
        if let Some(start) = self.start {
            if record.timestamp.map_or(true, |ts| ts < start) {
                return false;
            }
        }
        if let Some(end) = self.end {
            if record.timestamp.is_some_and(|ts| ts > end) {
                return false;
            }
        }

        match &self.search {
            SearchClause::None => true,
            SearchClause::Url(q) => {
                contains_ignore_case(&record.uri_stem, q) || contains_ignore_case(&record.uri_query, q)
            }
            SearchClause::Ip(q) => contains_ignore_case(&record.client_ip, q),
            SearchClause::Method(m) => record.method.eq_ignore_ascii_case(m),
            SearchClause::Status(code) => i64::from(record.status_code) == *code,
        }
    }

    /// `true` when every record passes.
    pub fn is_pass_all(&self) -> bool {
        !self.errors_only
            && self.search == SearchClause::None
            && self.start.is_none()
            && self.end.is_none()
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
