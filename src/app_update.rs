//! Background-message processing and filter dispatch for [`Session`].
//!
//! The reader and filter workers report over crossbeam channels. Owners
//! that poll call [`Session::process_messages`], which drains both with
//! `try_recv`; owners that block call [`Session::wait_for_filter`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app::{Session, SessionEvent};
use crate::core::filter_engine::{self, FilterMessage, FilterOutcome};
use crate::core::log_reader::ParseMessage;
use crate::util::time::format_duration;

// ── Core logic ──────────────────────────────────────────────────────────

impl Session {
    /// Poll the reader and filter channels and process what has arrived.
    ///
    /// Non-blocking: drains all available messages with `try_recv`.
    pub fn process_messages(&mut self) {
        if let Some(rx) = self.reader_rx.clone() {
            while let Ok(msg) = rx.try_recv() {
                self.handle_parse_message(msg);
                if self.reader_rx.is_none() {
                    break;
                }
            }
        }

        if let Some(rx) = self.filter_rx.clone() {
            while let Ok(msg) = rx.try_recv() {
                self.handle_filter_message(msg);
            }
        }
    }

    /// Block until the most recently requested filter pass has been
    /// applied. Returns immediately if nothing is pending.
    pub fn wait_for_filter(&mut self) {
        while self.is_filtering() {
            let Some(rx) = self.filter_rx.clone() else {
                break;
            };
            match rx.recv() {
                Ok(msg) => self.handle_filter_message(msg),
                Err(_) => {
                    tracing::warn!("Filter worker {} exited without a result", self.generation);
                    self.filter_rx = None;
                }
            }
        }
    }

    /// Cancel whatever pass is running and start a new one over the
    /// current record set and criteria.
    ///
    /// The new pass gets the next generation id. Results tagged with an
    /// older id are discarded on arrival, so only the latest request can
    /// ever become visible.
    pub(crate) fn request_refilter(&mut self) {
        if let Some(flag) = self.filter_cancel.take() {
            flag.store(true, Ordering::Relaxed);
        }
        // The superseded worker sees its flag, or a closed channel, and
        // exits on its own.
        self.filter_handle = None;

        self.generation += 1;
        let generation = self.generation;

        let (tx, rx) = crossbeam_channel::bounded::<FilterMessage>(1);
        let cancel = Arc::new(AtomicBool::new(false));

        match filter_engine::spawn_filter_thread(
            Arc::clone(&self.all_records),
            self.criteria.clone(),
            generation,
            tx,
            cancel.clone(),
        ) {
            Ok(handle) => {
                self.filter_rx = Some(rx);
                self.filter_cancel = Some(cancel);
                self.filter_handle = Some(handle);
            }
            Err(e) => {
                tracing::warn!("{}; filtering on the calling thread", e);
                self.filter_rx = None;
                let start = Instant::now();
                let outcome = filter_engine::apply(&self.all_records, &self.criteria);
                self.apply_outcome(generation, outcome, start.elapsed());
            }
        }
    }

    /// Cancel and join the running filter pass, if any. Used before the
    /// record set is replaced.
    pub(crate) fn quiesce_filter(&mut self) {
        if let Some(flag) = self.filter_cancel.take() {
            flag.store(true, Ordering::Relaxed);
        }
        self.filter_rx = None;
        if let Some(handle) = self.filter_handle.take() {
            let _ = handle.join();
        }
        self.applied_generation = self.generation;
    }

    pub(crate) fn handle_parse_message(&mut self, msg: ParseMessage) {
        match msg {
            ParseMessage::RecordBatch(batch) => {
                self.pending_records.extend(batch);
            }
            ParseMessage::Progress { count } => {
                self.progress_count = count;
            }
            ParseMessage::Complete {
                total,
                dropped,
                elapsed,
            } => self.finish_load(total, dropped, elapsed),
            ParseMessage::Error(message) => self.fail_load(message),
        }
    }

    fn handle_filter_message(&mut self, msg: FilterMessage) {
        match msg {
            FilterMessage::Complete {
                generation,
                outcome,
                elapsed,
            } if generation == self.generation => {
                self.apply_outcome(generation, outcome, elapsed);
            }
            FilterMessage::Complete { generation, .. } => {
                tracing::trace!("Discarding stale filter result {}", generation);
            }
            FilterMessage::Cancelled { generation } => {
                tracing::trace!("Filter pass {} acknowledged cancel", generation);
                if generation == self.generation {
                    self.filter_rx = None;
                }
            }
        }
    }

    /// Publish a finished pass. Indices and statistics are swapped in
    /// together so readers never see one without the other.
    fn apply_outcome(&mut self, generation: u64, outcome: FilterOutcome, elapsed: Duration) {
        self.filtered_indices = outcome.indices;
        self.stats = outcome.stats;
        self.applied_generation = generation;
        self.filter_elapsed = Some(elapsed);
        self.filter_rx = None;
        self.filter_cancel = None;
        self.filter_handle = None;

        tracing::debug!(
            "Applied filter pass {}: {} of {} records",
            generation,
            self.filtered_indices.len(),
            self.all_records.len()
        );

        let stats = self.stats.clone();
        self.emit(SessionEvent::FilterApplied {
            generation,
            stats,
            elapsed,
        });
    }

    fn finish_load(&mut self, total: usize, dropped: usize, elapsed: Duration) {
        self.reader_rx = None;
        self.reader_cancel = None;
        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.join();
        }

        let records = std::mem::take(&mut self.pending_records);
        self.total_in_file = records.len();
        self.all_records = Arc::new(records);
        self.loaded_file_name = Some(self.pending_file_name.clone());
        self.load_error = None;
        self.status_text = format!("Loaded {} entries.", self.total_in_file);

        tracing::info!(
            "Load complete: {} entries from {} in {} ({} lines dropped)",
            total,
            self.pending_file_name,
            format_duration(elapsed),
            dropped
        );

        self.emit(SessionEvent::Loaded {
            file_name: self.pending_file_name.clone(),
            record_count: self.total_in_file,
        });

        self.clear_filters();
    }

    pub(crate) fn fail_load(&mut self, message: String) {
        self.cancel_loading();
        self.pending_records.clear();
        self.all_records = Arc::new(Vec::new());
        self.filtered_indices.clear();
        self.stats = Default::default();
        self.total_in_file = 0;
        self.loaded_file_name = None;
        self.status_text = format!("Error: {message}");

        tracing::error!("Load of {} failed: {}", self.pending_file_name, message);

        self.load_error = Some(message.clone());
        self.emit(SessionEvent::LoadFailed { message });
    }
}
