//! Summary statistics over a filtered record set.
//!
//! A [`Statistics`] value is built from scratch by feeding every retained
//! record to a [`StatsAccumulator`] during the filter pass, then frozen with
//! [`StatsAccumulator::finish`]. Nothing is carried over between passes.

use std::collections::{HashMap, HashSet};

use crate::core::log_record::{LogRecord, StatusClass};
use crate::util::constants::NO_URL_PLACEHOLDER;

/// Immutable statistics snapshot for one filter pass.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Statistics {
    /// Records retained by the filter.
    pub total_count: usize,
    /// 2xx responses.
    pub success_count: usize,
    /// Status >= 400. Overlaps the client/server error counts.
    pub error_count: usize,
    /// 3xx responses.
    pub redirect_count: usize,
    /// 4xx responses.
    pub client_error_count: usize,
    /// 5xx responses.
    pub server_error_count: usize,
    pub get_count: usize,
    pub post_count: usize,
    /// Distinct client IPs; an empty IP counts as one value.
    pub unique_ip_count: usize,
    /// Requests that look like OAuth token calls.
    pub token_endpoint_count: usize,
    /// Most frequent URI stem, or `"-"` when nothing was retained.
    pub most_requested_url: String,
    /// Count behind `most_requested_url`.
    pub most_requested_count: usize,
    /// Largest `time-taken` among retained records, 0 when none.
    pub slowest_response_time_ms: i32,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            total_count: 0,
            success_count: 0,
            error_count: 0,
            redirect_count: 0,
            client_error_count: 0,
            server_error_count: 0,
            get_count: 0,
            post_count: 0,
            unique_ip_count: 0,
            token_endpoint_count: 0,
            most_requested_url: NO_URL_PLACEHOLDER.to_owned(),
            most_requested_count: 0,
            slowest_response_time_ms: 0,
        }
    }
}

impl Statistics {
    /// Compute statistics for `records` in one pass.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a LogRecord>) -> Self {
        let mut acc = StatsAccumulator::default();
        for r in records {
            acc.add(r);
        }
        acc.finish()
    }

    /// Share of retained requests that failed, in percent.
    pub fn error_rate(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.error_count as f64 * 100.0 / self.total_count as f64
        }
    }

    pub fn slowest_response_time_seconds(&self) -> f64 {
        self.slowest_response_time_ms as f64 / 1000.0
    }
}

/// Running counters for a single pass. Borrows string keys from the records
/// it has seen, so it cannot outlive the record set.
#[derive(Debug, Default)]
pub struct StatsAccumulator<'a> {
    stats: Statistics,
    ips: HashSet<&'a str>,
    /// Position of each stem in `url_counts`.
    url_slots: HashMap<&'a str, usize>,
    /// `(stem, count)` in first-seen order.
    url_counts: Vec<(&'a str, usize)>,
    slowest: Option<i32>,
}

impl<'a> StatsAccumulator<'a> {
    /// Fold one retained record into the counters.
    pub fn add(&mut self, r: &'a LogRecord) {
        let s = &mut self.stats;
        s.total_count += 1;

        match r.status_class() {
            StatusClass::Success => s.success_count += 1,
            StatusClass::Redirect => s.redirect_count += 1,
            StatusClass::ClientError => s.client_error_count += 1,
            StatusClass::ServerError => s.server_error_count += 1,
            StatusClass::Other => {}
        }
        if r.is_error() {
            s.error_count += 1;
        }

        if r.method.eq_ignore_ascii_case("GET") {
            s.get_count += 1;
        } else if r.method.eq_ignore_ascii_case("POST") {
            s.post_count += 1;
        }

        if r.is_token_request() {
            s.token_endpoint_count += 1;
        }

        self.slowest = Some(self.slowest.map_or(r.time_taken_ms, |m| m.max(r.time_taken_ms)));

        self.ips.insert(r.client_ip.as_str());

        let stem = r.uri_stem.as_str();
        match self.url_slots.get(stem) {
            Some(&slot) => self.url_counts[slot].1 += 1,
            None => {
                self.url_slots.insert(stem, self.url_counts.len());
                self.url_counts.push((stem, 1));
            }
        }
    }

    /// Freeze the counters into a [`Statistics`] value.
    ///
    /// Ties for the most requested URL go to the stem seen first.
    pub fn finish(self) -> Statistics {
        let mut stats = self.stats;
        stats.unique_ip_count = self.ips.len();
        stats.slowest_response_time_ms = self.slowest.unwrap_or(0);

        let mut best: Option<(&str, usize)> = None;
        for &(stem, count) in &self.url_counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((stem, count));
            }
        }
        if let Some((stem, count)) = best {
            stats.most_requested_url = stem.to_owned();
            stats.most_requested_count = count;
        }
        stats
    }
}
