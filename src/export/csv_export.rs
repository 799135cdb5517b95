//! CSV export for filtered log records.
//!
//! Writes one row per record with the W3C fields IISLens keeps.

use std::path::Path;

use crate::core::log_record::LogRecord;
use crate::util::error::{IisLensError, Result};
use crate::util::time::format_table_timestamp;

/// Column headers, in output order.
pub const CSV_HEADER: [&str; 12] = [
    "Timestamp",
    "Method",
    "UriStem",
    "UriQuery",
    "Port",
    "Username",
    "ClientIp",
    "UserAgent",
    "Status",
    "SubStatus",
    "TimeTakenMs",
    "BytesSent",
];

/// Export `records` to a CSV file at `path`.
///
/// # Errors
/// Returns [`IisLensError::Export`] if the file cannot be created or written.
pub fn export_csv(records: &[LogRecord], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| IisLensError::Export(format!("Failed to create CSV file: {e}")))?;
    write_csv(records, file)?;

    tracing::info!(
        "Exported {} records to CSV: {}",
        records.len(),
        path.display()
    );
    Ok(())
}

/// Write `records` as CSV to any writer.
pub fn write_csv<W: std::io::Write>(records: &[LogRecord], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    writer
        .write_record(CSV_HEADER)
        .map_err(|e| IisLensError::Export(format!("Failed to write CSV header: {e}")))?;

    for r in records {
        writer
            .write_record([
                &format_table_timestamp(r.timestamp.as_ref()),
                &r.method,
                &r.uri_stem,
                &r.uri_query,
                &r.port.to_string(),
                &r.username,
                &r.client_ip,
                &r.user_agent,
                &r.status_code.to_string(),
                &r.sub_status.to_string(),
                &r.time_taken_ms.to_string(),
                &r.bytes_sent.to_string(),
            ])
            .map_err(|e| IisLensError::Export(format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| IisLensError::Export(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_timestamp_is_blank_cell() {
        let record = LogRecord {
            method: "GET".into(),
            uri_stem: "/a b".into(),
            user_agent: "Mozilla/5.0 (X11, Linux)".into(),
            status_code: 200,
            ..Default::default()
        };
        let mut buf = Vec::new();
        write_csv(&[record], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Timestamp,Method"));
        let row = lines.next().unwrap();
        assert!(row.starts_with(",GET,/a b,"));
        assert!(row.contains("\"Mozilla/5.0 (X11, Linux)\""));
    }
}
