//! Single-pass filter and aggregation engine.
//!
//! [`apply`] walks the full record set once, keeping the indices of the
//! records that match and folding each of them into the statistics. The
//! cancellable variant is what the background worker runs: it checks the
//! cancel flag at the start, before the scan, and every
//! [`CANCEL_CHECK_INTERVAL`] records, and throws away partial work when
//! the flag is set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::core::criteria::FilterCriteria;
use crate::core::filter::RecordFilter;
use crate::core::log_record::LogRecord;
use crate::core::statistics::{Statistics, StatsAccumulator};
use crate::util::constants::CANCEL_CHECK_INTERVAL;
use crate::util::error::{IisLensError, Result};

/// Result of one completed filter pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Indices into the record set, in input order.
    pub indices: Vec<usize>,
    /// Statistics over exactly those records.
    pub stats: Statistics,
}

/// Messages sent from the filter worker to the session.
#[derive(Debug)]
pub enum FilterMessage {
    /// The pass for `generation` finished.
    Complete {
        generation: u64,
        outcome: FilterOutcome,
        elapsed: Duration,
    },
    /// The pass for `generation` noticed its cancel flag and stopped.
    Cancelled { generation: u64 },
}

/// Filter `records` and compute statistics for the retained subset.
pub fn apply(records: &[LogRecord], criteria: &FilterCriteria) -> FilterOutcome {
    let never = AtomicBool::new(false);
    // Cannot be cancelled, so always `Some`.
    apply_cancellable(records, criteria, &never).unwrap_or_else(|| FilterOutcome {
        indices: Vec::new(),
        stats: Statistics::default(),
    })
}

/// Like [`apply`], but returns `None` as soon as `cancel` is observed set.
pub fn apply_cancellable(
    records: &[LogRecord],
    criteria: &FilterCriteria,
    cancel: &AtomicBool,
) -> Option<FilterOutcome> {
    scan(records, criteria, || cancel.load(Ordering::Relaxed))
}

/// The filter loop, polling `is_cancelled` at the start, before the scan and
/// every [`CANCEL_CHECK_INTERVAL`] records.
fn scan(
    records: &[LogRecord],
    criteria: &FilterCriteria,
    is_cancelled: impl Fn() -> bool,
) -> Option<FilterOutcome> {
    if is_cancelled() {
        return None;
    }

    let filter = RecordFilter::new(criteria);
    let mut acc = StatsAccumulator::default();
    let mut indices = Vec::with_capacity(if filter.is_pass_all() {
        records.len()
    } else {
        0
    });

    if is_cancelled() {
        return None;
    }

    for (i, record) in records.iter().enumerate() {
        if i % CANCEL_CHECK_INTERVAL == 0 && i > 0 && is_cancelled() {
            return None;
        }
        if filter.matches(record) {
            indices.push(i);
            acc.add(record);
        }
    }

    Some(FilterOutcome {
        indices,
        stats: acc.finish(),
    })
}

/// Spawn a worker that filters `records` with `criteria` and reports the
/// outcome tagged with `generation`.
///
/// Set `cancel` to `true` to abandon the pass; the worker then sends
/// `Cancelled` (if anyone is still listening) instead of a result.
///
/// # Errors
/// Returns [`IisLensError::ThreadSpawn`] if the OS refuses a new thread.
pub fn spawn_filter_thread(
    records: Arc<Vec<LogRecord>>,
    criteria: FilterCriteria,
    generation: u64,
    sender: Sender<FilterMessage>,
    cancel: Arc<AtomicBool>,
) -> Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("filter-{generation}"))
        .spawn(move || {
            let start = Instant::now();
            let msg = match apply_cancellable(&records, &criteria, &cancel) {
                Some(outcome) => {
                    let elapsed = start.elapsed();
                    tracing::debug!(
                        "Filter pass {} kept {} of {} records in {:.1}ms",
                        generation,
                        outcome.indices.len(),
                        records.len(),
                        elapsed.as_secs_f64() * 1000.0
                    );
                    FilterMessage::Complete {
                        generation,
                        outcome,
                        elapsed,
                    }
                }
                None => {
                    tracing::trace!("Filter pass {} cancelled", generation);
                    FilterMessage::Cancelled { generation }
                }
            };
            let _ = sender.send(msg);
        })
        .map_err(|_| IisLensError::ThreadSpawn("filter"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::criteria::SearchType;

    fn records() -> Vec<LogRecord> {
        [
            ("GET", "/a", "1.1.1.1", 200),
            ("POST", "/b", "1.1.1.2", 500),
            ("GET", "/a", "1.1.1.1", 404),
            ("GET", "/c", "1.1.1.3", 302),
        ]
        .into_iter()
        .map(|(m, s, ip, st)| LogRecord {
            method: m.into(),
            uri_stem: s.into(),
            client_ip: ip.into(),
            status_code: st,
            ..Default::default()
        })
        .collect()
    }

    #[test]
    fn test_unset_criteria_keeps_everything() {
        let all = records();
        let out = apply(&all, &FilterCriteria::default());
        assert_eq!(out.indices, vec![0, 1, 2, 3]);
        assert_eq!(out.stats.total_count, all.len());
    }

    #[test]
    fn test_stats_cover_only_retained_records() {
        let all = records();
        let out = apply(
            &all,
            &FilterCriteria {
                show_errors_only: true,
                ..Default::default()
            },
        );
        assert_eq!(out.indices, vec![1, 2]);
        assert_eq!(out.stats.total_count, 2);
        assert_eq!(out.stats.success_count, 0);
        assert_eq!(out.stats.error_count, 2);
        assert_eq!(out.stats.unique_ip_count, 2);
    }

    #[test]
    fn test_empty_input() {
        let out = apply(&[], &FilterCriteria::default());
        assert!(out.indices.is_empty());
        assert_eq!(out.stats.most_requested_url, "-");
    }

    #[test]
    fn test_non_numeric_status_search_equals_no_search() {
        let all = records();
        let plain = apply(&all, &FilterCriteria::default());
        let abc = apply(
            &all,
            &FilterCriteria {
                search_type: SearchType::Status,
                search_text: "abc".into(),
                ..Default::default()
            },
        );
        assert_eq!(plain, abc);
    }

    #[test]
    fn test_pre_cancelled_pass_returns_none() {
        let cancel = AtomicBool::new(true);
        assert!(apply_cancellable(&records(), &FilterCriteria::default(), &cancel).is_none());
    }

    #[test]
    fn test_cancel_during_scan_discards_partial_work() {
        let many: Vec<LogRecord> = records()
            .into_iter()
            .cycle()
            .take(CANCEL_CHECK_INTERVAL * 3)
            .collect();
        let checks = std::cell::Cell::new(0);
        // Checks 1 and 2 run before the loop; the third is the first
        // in-loop check at record CANCEL_CHECK_INTERVAL.
        let outcome = scan(&many, &FilterCriteria::default(), || {
            checks.set(checks.get() + 1);
            checks.get() >= 3
        });
        assert!(outcome.is_none());
        assert_eq!(checks.get(), 3);
    }

    #[test]
    fn test_scan_polls_periodically() {
        let many: Vec<LogRecord> = records()
            .into_iter()
            .cycle()
            .take(CANCEL_CHECK_INTERVAL * 3)
            .collect();
        let checks = std::cell::Cell::new(0);
        let outcome = scan(&many, &FilterCriteria::default(), || {
            checks.set(checks.get() + 1);
            false
        });
        assert_eq!(outcome.unwrap().indices.len(), many.len());
        // Start, pre-scan, then at 1x and 2x the interval.
        assert_eq!(checks.get(), 4);
    }

    #[test]
    fn test_worker_reports_generation() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = spawn_filter_thread(
            Arc::new(records()),
            FilterCriteria::default(),
            7,
            tx,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        handle.join().unwrap();
        match rx.try_recv().unwrap() {
            FilterMessage::Complete {
                generation,
                outcome,
                ..
            } => {
                assert_eq!(generation, 7);
                assert_eq!(outcome.indices.len(), 4);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_worker_reports_cancelled() {
        let (tx, rx) = crossbeam_channel::unbounded();
        spawn_filter_thread(
            Arc::new(records()),
            FilterCriteria::default(),
            3,
            tx,
            Arc::new(AtomicBool::new(true)),
        )
        .unwrap()
        .join()
        .unwrap();
        assert!(matches!(
            rx.try_recv(),
            Ok(FilterMessage::Cancelled { generation: 3 })
        ));
    }
}
