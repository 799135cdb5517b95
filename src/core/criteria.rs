//! Filter criteria: the full set of user-facing filter inputs.
//!
//! [`FilterCriteria`] is a plain value. The session rebuilds it whenever an
//! input changes and hands a clone to the filter worker, so a running pass
//! never observes a half-applied edit.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::util::error::IisLensError;
use crate::util::time::{day_ceiling, day_floor, parse_hour_minute};

/// Which record field the free-text search targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SearchType {
    /// Substring of the URI stem or query.
    #[default]
    Url,
    /// Substring of the client IP.
    Ip,
    /// Exact HTTP method.
    Method,
    /// Exact status code.
    Status,
}

impl SearchType {
    pub const ALL: [SearchType; 4] = [
        SearchType::Url,
        SearchType::Ip,
        SearchType::Method,
        SearchType::Status,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SearchType::Url => "URL",
            SearchType::Ip => "IP",
            SearchType::Method => "Method",
            SearchType::Status => "Status",
        }
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for SearchType {
    type Err = IisLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| IisLensError::InvalidInput(format!("unknown search type '{s}'")))
    }
}

/// Holds all active filter criteria.
///
/// All fields default to "pass all" so that a default `FilterCriteria`
/// matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Keep only records with status >= 400.
    pub show_errors_only: bool,

    /// Field targeted by `search_text`.
    pub search_type: SearchType,

    /// Free-text search. Blank means no search clause.
    pub search_text: String,

    /// Lower date bound. `None` = no lower bound.
    pub start_date: Option<NaiveDate>,

    /// Time of day combined with `start_date` when `include_start_time` is set.
    pub start_time: Option<NaiveTime>,

    /// Upper date bound. `None` = no upper bound.
    pub end_date: Option<NaiveDate>,

    /// Time of day combined with `end_date` when `include_end_time` is set.
    pub end_time: Option<NaiveTime>,

    /// Use `start_time` instead of the 00:00:00 floor.
    pub include_start_time: bool,

    /// Use `end_time` instead of the 23:59:59 ceiling.
    pub include_end_time: bool,
}

/// A single edit to the criteria. Any edit that changes a value triggers
/// a re-filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaChange {
    ShowErrorsOnly(bool),
    SearchType(SearchType),
    SearchText(String),
    StartDate(Option<NaiveDate>),
    StartTime(Option<NaiveTime>),
    EndDate(Option<NaiveDate>),
    EndTime(Option<NaiveTime>),
    /// Hour and minute text fields for the start time. Ignored unless the
    /// hour is 0-23 and the minute 0-59, so the previous time is kept.
    StartHourMinute(String, String),
    /// Hour and minute text fields for the end time, validated the same way.
    EndHourMinute(String, String),
    IncludeStartTime(bool),
    IncludeEndTime(bool),
    /// Replace everything at once, e.g. from a preset.
    Replace(FilterCriteria),
}

impl FilterCriteria {
    /// Apply one edit. Returns `false` if the value was already current,
    /// so callers can skip a pointless re-filter.
    pub fn apply(&mut self, change: CriteriaChange) -> bool {
        let before = self.clone();
        match change {
            CriteriaChange::ShowErrorsOnly(v) => self.show_errors_only = v,
            CriteriaChange::SearchType(v) => self.search_type = v,
            CriteriaChange::SearchText(v) => self.search_text = v,
            CriteriaChange::StartDate(v) => self.start_date = v,
            CriteriaChange::StartTime(v) => self.start_time = v,
            CriteriaChange::EndDate(v) => self.end_date = v,
            CriteriaChange::EndTime(v) => self.end_time = v,
            CriteriaChange::StartHourMinute(h, m) => {
                if let Some(t) = parse_hour_minute(&h, &m) {
                    self.start_time = Some(t);
                }
            }
            CriteriaChange::EndHourMinute(h, m) => {
                if let Some(t) = parse_hour_minute(&h, &m) {
                    self.end_time = Some(t);
                }
            }
            CriteriaChange::IncludeStartTime(v) => self.include_start_time = v,
            CriteriaChange::IncludeEndTime(v) => self.include_end_time = v,
            CriteriaChange::Replace(v) => *self = v,
        }
        *self != before
    }

    /// Inclusive lower timestamp bound, if a start date is set.
    pub fn start_bound(&self) -> Option<NaiveDateTime> {
        let time = self
            .start_time
            .filter(|_| self.include_start_time)
            .unwrap_or_else(day_floor);
        self.start_date.map(|d| d.and_time(time))
    }

    /// Inclusive upper timestamp bound, if an end date is set.
    pub fn end_bound(&self) -> Option<NaiveDateTime> {
        let time = self
            .end_time
            .filter(|_| self.include_end_time)
            .unwrap_or_else(day_ceiling);
        self.end_date.map(|d| d.and_time(time))
    }

    /// Search text exactly as typed, or `None` when it is blank and the
    /// search clause should be skipped.
    pub fn active_search(&self) -> Option<&str> {
        let t = self.search_text.as_str();
        (!t.trim().is_empty()).then_some(t)
    }

    /// Returns `true` if all criteria are at their default (pass-all) state.
    pub fn is_empty(&self) -> bool {
        !self.show_errors_only
            && self.active_search().is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    /// Reset all criteria to their default (pass-all) state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
