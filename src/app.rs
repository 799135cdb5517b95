//! Top-level session state for IISLens.
//!
//! [`Session`] owns the loaded record set, the active filter criteria, the
//! current filtered view with its statistics, and the channels to the
//! background reader and filter threads. It is the interface a front end
//! drives: load a file, change criteria, then pull the view and stats.
//! Message processing and the filter dispatch live in `app_update.rs`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::core::criteria::{CriteriaChange, FilterCriteria};
use crate::core::filter_engine::FilterMessage;
use crate::core::log_reader::{self, ParseMessage};
use crate::core::log_record::LogRecord;
use crate::core::statistics::Statistics;
use crate::util::constants;

/// Notifications pushed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A file finished loading and filters were reset.
    Loaded {
        file_name: String,
        record_count: usize,
    },
    /// A load failed; the record set is empty.
    LoadFailed { message: String },
    /// A filter pass finished and its results are now current.
    FilterApplied {
        generation: u64,
        stats: Statistics,
        elapsed: Duration,
    },
}

/// Outcome of [`Session::load_log_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Records parsed from the file (0 on failure).
    pub record_count: usize,
    /// Short message for the user when the load failed.
    pub error: Option<String>,
}

/// Central state for one interactive analysis session.
pub struct Session {
    // ── Record storage ──────────────────────────────────────────
    /// Full record set from the last successful load. Shared read-only
    /// with the filter worker.
    pub(crate) all_records: Arc<Vec<LogRecord>>,
    /// Records received from the reader for a load still in progress.
    pub(crate) pending_records: Vec<LogRecord>,
    /// Indices into `all_records` that match the current criteria.
    pub(crate) filtered_indices: Vec<usize>,
    /// Statistics for `filtered_indices`.
    pub(crate) stats: Statistics,

    // ── Filter state ────────────────────────────────────────────
    pub(crate) criteria: FilterCriteria,
    /// Id of the most recently requested pass.
    pub(crate) generation: u64,
    /// Id of the pass whose results are currently shown.
    pub(crate) applied_generation: u64,
    pub(crate) filter_rx: Option<Receiver<FilterMessage>>,
    pub(crate) filter_cancel: Option<Arc<AtomicBool>>,
    pub(crate) filter_handle: Option<std::thread::JoinHandle<()>>,
    pub(crate) filter_elapsed: Option<Duration>,

    // ── Loading state ───────────────────────────────────────────
    pub(crate) reader_rx: Option<Receiver<ParseMessage>>,
    pub(crate) reader_cancel: Option<Arc<AtomicBool>>,
    pub(crate) reader_handle: Option<std::thread::JoinHandle<()>>,
    pub(crate) pending_file_name: String,
    pub(crate) loaded_file_name: Option<String>,
    pub(crate) total_in_file: usize,
    pub(crate) progress_count: usize,
    pub(crate) status_text: String,
    /// Message from the last failed load, cleared on the next success.
    pub(crate) load_error: Option<String>,

    pub(crate) subscribers: Vec<Sender<SessionEvent>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            all_records: Arc::new(Vec::new()),
            pending_records: Vec::new(),
            filtered_indices: Vec::new(),
            stats: Statistics::default(),
            criteria: FilterCriteria::default(),
            generation: 0,
            applied_generation: 0,
            filter_rx: None,
            filter_cancel: None,
            filter_handle: None,
            filter_elapsed: None,
            reader_rx: None,
            reader_cancel: None,
            reader_handle: None,
            pending_file_name: String::new(),
            loaded_file_name: None,
            total_in_file: 0,
            progress_count: 0,
            status_text: "Ready".into(),
            load_error: None,
            subscribers: Vec::new(),
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Every record from the loaded file, in file order.
    pub fn records(&self) -> &[LogRecord] {
        &self.all_records
    }

    /// Records passing the current criteria, in file order.
    pub fn filtered_view(&self) -> impl Iterator<Item = &LogRecord> + '_ {
        self.filtered_indices
            .iter()
            .filter_map(|&i| self.all_records.get(i))
    }

    /// Owned copy of the filtered view, for export.
    pub fn filtered_records(&self) -> Vec<LogRecord> {
        self.filtered_view().cloned().collect()
    }

    /// Number of records in the filtered view.
    pub fn filtered_len(&self) -> usize {
        self.filtered_indices.len()
    }

    /// Statistics for the filtered view.
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// `true` while a filter pass is in flight.
    pub fn is_filtering(&self) -> bool {
        self.applied_generation != self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.reader_rx.is_some()
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn loaded_file_name(&self) -> Option<&str> {
        self.loaded_file_name.as_deref()
    }

    /// Records parsed from the current file, before filtering.
    pub fn total_in_file(&self) -> usize {
        self.total_in_file
    }

    /// Records received so far by an in-progress load.
    pub fn progress_count(&self) -> usize {
        self.progress_count
    }

    /// Duration of the last applied filter pass.
    pub fn filter_elapsed(&self) -> Option<Duration> {
        self.filter_elapsed
    }

    /// Register for [`SessionEvent`]s. The channel is dropped from the
    /// subscriber list once its receiver goes away.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    // ── Loading ─────────────────────────────────────────────────

    /// Load `path`, blocking until the file has been parsed.
    ///
    /// The previous record set is cleared first. On success the filters
    /// are reset and a pass over the new set is started; call
    /// [`Session::wait_for_filter`] or [`Session::process_messages`] to
    /// pick up its results. Failures are reported in the returned
    /// [`LoadReport`], never as a panic.
    pub fn load_log_file(&mut self, path: &Path) -> LoadReport {
        self.start_loading(path);
        while let Some(rx) = self.reader_rx.clone() {
            match rx.recv() {
                Ok(msg) => self.handle_parse_message(msg),
                Err(_) => {
                    // Reader exited without a final message.
                    self.fail_load("reader stopped unexpectedly".into());
                }
            }
        }

        match &self.load_error {
            None => LoadReport {
                record_count: self.total_in_file,
                error: None,
            },
            Some(message) => LoadReport {
                record_count: 0,
                error: Some(message.clone()),
            },
        }
    }

    /// Begin loading `path` on a background thread.
    ///
    /// Quiesces any in-flight load or filter pass, clears existing data,
    /// then spawns the reader. Progress arrives via
    /// [`Session::process_messages`].
    pub fn start_loading(&mut self, path: &Path) {
        self.cancel_loading();
        self.quiesce_filter();

        self.all_records = Arc::new(Vec::new());
        self.pending_records.clear();
        self.filtered_indices.clear();
        self.stats = Statistics::default();
        self.loaded_file_name = None;
        self.total_in_file = 0;
        self.progress_count = 0;
        self.filter_elapsed = None;
        self.load_error = None;
        self.pending_file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let (tx, rx) = crossbeam_channel::bounded(constants::CHANNEL_BOUND);
        let cancel = Arc::new(AtomicBool::new(false));

        match log_reader::spawn_parser_thread(path.to_path_buf(), tx, cancel.clone()) {
            Ok(handle) => {
                self.reader_rx = Some(rx);
                self.reader_cancel = Some(cancel);
                self.reader_handle = Some(handle);
                self.status_text = "Parsing logs\u{2026}".into();
                tracing::info!("Loading {}", path.display());
            }
            Err(e) => {
                tracing::error!("{}", e);
                self.fail_load(e.to_string());
            }
        }
    }

    /// Request cancellation of the current reader thread.
    pub fn cancel_loading(&mut self) {
        if let Some(flag) = &self.reader_cancel {
            flag.store(true, Ordering::Relaxed);
        }
        self.reader_rx = None;
        self.reader_cancel = None;
        // Dropping the receiver unblocks a reader stuck on a full channel,
        // so the join cannot hang.
        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.join();
        }
    }

    // ── Criteria ────────────────────────────────────────────────

    /// Apply one criteria edit and, if anything changed, start a new pass
    /// superseding any pass still running.
    pub fn update_criteria(&mut self, change: CriteriaChange) {
        if self.criteria.apply(change) {
            self.request_refilter();
        }
    }

    /// Re-run the filter with unchanged criteria.
    pub fn reapply(&mut self) {
        self.request_refilter();
    }

    /// Reset all criteria to their defaults and re-apply.
    pub fn clear_filters(&mut self) {
        self.criteria.clear();
        self.request_refilter();
    }

    /// Send `event` to every live subscriber.
    pub(crate) fn emit(&mut self, event: SessionEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(flag) = &self.reader_cancel {
            flag.store(true, Ordering::Relaxed);
        }
        if let Some(flag) = &self.filter_cancel {
            flag.store(true, Ordering::Relaxed);
        }
    }
}
