//! Background log file reader thread.
//!
//! Streams a log file through [`LogParser`] on a worker thread. Parsed
//! [`LogRecord`] batches are sent to the owner via a [`crossbeam_channel`]
//! sender; the owner drains the receiving end with non-blocking
//! `try_recv` or blocks on `recv` when it has nothing else to do.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;

use crate::core::log_parser::LogParser;
use crate::core::log_record::LogRecord;
use crate::util::constants::PARSE_BATCH_SIZE;
use crate::util::error::{IisLensError, Result};

/// Messages sent from the reader thread to the session.
#[derive(Debug)]
pub enum ParseMessage {
    /// A batch of parsed records, in file order.
    RecordBatch(Vec<LogRecord>),
    /// Progress update: records parsed so far.
    Progress { count: usize },
    /// The whole file was read.
    Complete {
        total: usize,
        dropped: usize,
        elapsed: std::time::Duration,
    },
    /// The file could not be opened or read. Fatal for this load; any
    /// batches already sent must be discarded.
    Error(String),
}

/// Spawn a background thread that parses the log file at `path`.
///
/// Set `cancel` to `true` to request termination; the thread then exits
/// without sending `Complete`.
///
/// # Errors
/// Returns [`IisLensError::ThreadSpawn`] if the OS refuses a new thread.
pub fn spawn_parser_thread(
    path: PathBuf,
    sender: Sender<ParseMessage>,
    cancel: Arc<AtomicBool>,
) -> Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("log-reader".into())
        .spawn(move || reader_thread_main(path, sender, cancel))
        .map_err(|_| IisLensError::ThreadSpawn("log reader"))
}

fn reader_thread_main(path: PathBuf, sender: Sender<ParseMessage>, cancel: Arc<AtomicBool>) {
    let start = Instant::now();

    let mut parser = match LogParser::open(&path) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("{}", e);
            let _ = sender.send(ParseMessage::Error(e.to_string()));
            return;
        }
    };

    let mut batch = Vec::with_capacity(PARSE_BATCH_SIZE);
    let mut total = 0usize;

    for item in parser.by_ref() {
        if cancel.load(Ordering::Relaxed) {
            tracing::debug!("Reader cancelled after {} records", total);
            return;
        }
        match item {
            Ok(record) => batch.push(record),
            Err(e) => {
                tracing::warn!("Read of '{}' failed: {}", path.display(), e);
                let _ = sender.send(ParseMessage::Error(e.to_string()));
                return;
            }
        }
        if batch.len() >= PARSE_BATCH_SIZE {
            total += batch.len();
            let full = std::mem::replace(&mut batch, Vec::with_capacity(PARSE_BATCH_SIZE));
            if sender.send(ParseMessage::RecordBatch(full)).is_err() {
                // Receiver dropped: the owner moved on to another file.
                return;
            }
            let _ = sender.send(ParseMessage::Progress { count: total });
        }
    }

    if cancel.load(Ordering::Relaxed) {
        return;
    }

    total += batch.len();
    if !batch.is_empty() {
        let _ = sender.send(ParseMessage::RecordBatch(batch));
    }

    let counters = parser.counters();
    let elapsed = start.elapsed();
    tracing::info!(
        "Reader complete: {} records from '{}' in {:.2}s ({} lines dropped)",
        total,
        path.display(),
        elapsed.as_secs_f64(),
        counters.dropped
    );
    let _ = sender.send(ParseMessage::Complete {
        total,
        dropped: counters.dropped,
        elapsed,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_reader_streams_all_records() {
        let mut body = String::from("#Fields: cs-method cs-uri-stem sc-status\n");
        for i in 0..(PARSE_BATCH_SIZE + 10) {
            body.push_str(&format!("GET /p{i} 200\n"));
        }
        body.push_str("bad\n");
        let path = write_temp("iislens_reader_stream.log", &body);

        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = spawn_parser_thread(path.clone(), tx, Arc::new(AtomicBool::new(false))).unwrap();
        handle.join().unwrap();

        let mut records = Vec::new();
        let mut complete = None;
        for msg in rx.try_iter() {
            match msg {
                ParseMessage::RecordBatch(b) => records.extend(b),
                ParseMessage::Complete { total, dropped, .. } => complete = Some((total, dropped)),
                ParseMessage::Progress { .. } => {}
                ParseMessage::Error(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(records.len(), PARSE_BATCH_SIZE + 10);
        assert_eq!(records[0].uri_stem, "/p0");
        assert_eq!(complete, Some((PARSE_BATCH_SIZE + 10, 1)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_reader_reports_missing_file() {
        let path = std::env::temp_dir().join("iislens_reader_missing_file.log");
        let (tx, rx) = crossbeam_channel::unbounded();
        spawn_parser_thread(path, tx, Arc::new(AtomicBool::new(false)))
            .unwrap()
            .join()
            .unwrap();
        assert!(matches!(rx.try_recv(), Ok(ParseMessage::Error(_))));
    }

    #[test]
    fn test_cancelled_reader_sends_no_completion() {
        let path = write_temp(
            "iislens_reader_cancel.log",
            "#Fields: cs-method\nGET\nPOST\n",
        );
        let (tx, rx) = crossbeam_channel::unbounded();
        spawn_parser_thread(path.clone(), tx, Arc::new(AtomicBool::new(true)))
            .unwrap()
            .join()
            .unwrap();
        assert!(rx
            .try_iter()
            .all(|m| !matches!(m, ParseMessage::Complete { .. })));
        let _ = std::fs::remove_file(path);
    }
}
