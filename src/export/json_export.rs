//! JSON export for the filtered view.
//!
//! Writes a pretty-printed object holding the statistics snapshot and the
//! records it was computed over.

use std::path::Path;

use crate::core::log_record::LogRecord;
use crate::core::statistics::Statistics;
use crate::util::error::{IisLensError, Result};

#[derive(serde::Serialize)]
struct Report<'a> {
    statistics: &'a Statistics,
    records: &'a [LogRecord],
}

/// Export `records` and their `stats` to a JSON file at `path`.
///
/// # Errors
/// Returns [`IisLensError::Export`] if the file cannot be created or written.
pub fn export_json(records: &[LogRecord], stats: &Statistics, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| IisLensError::Export(format!("Failed to create JSON file: {e}")))?;

    let mut writer = std::io::BufWriter::new(file);
    write_json(records, stats, &mut writer)?;

    // BufWriter::drop would swallow a late I/O error.
    use std::io::Write;
    writer
        .flush()
        .map_err(|e| IisLensError::Export(format!("Failed to flush JSON output: {e}")))?;

    tracing::info!(
        "Exported {} records to JSON: {}",
        records.len(),
        path.display()
    );
    Ok(())
}

/// Write the report to any writer.
pub fn write_json<W: std::io::Write>(
    records: &[LogRecord],
    stats: &Statistics,
    out: W,
) -> Result<()> {
    serde_json::to_writer_pretty(out, &Report { statistics: stats, records })
        .map_err(|e| IisLensError::Export(format!("Failed to write JSON: {e}")))
}
