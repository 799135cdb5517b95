//! Tolerant, streaming parser for W3C extended (IIS) log files.
//!
//! The column layout is not fixed: every `#Fields:` directive replaces the
//! active [`FieldSchema`], and data lines are decoded by field name. Bad
//! lines are dropped one at a time; only an I/O failure ends the stream.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::field_schema::FieldSchema;
use crate::core::log_record::LogRecord;
use crate::util::constants::{COLUMN_SEPARATOR, COMMENT_PREFIX};
use crate::util::error::{file_err, IisLensError, Result};
use crate::util::time::parse_log_timestamp;

/// W3C field names consumed by [`LogRecord`].
pub mod fields {
    pub const DATE: &str = "date";
    pub const TIME: &str = "time";
    pub const METHOD: &str = "cs-method";
    pub const URI_STEM: &str = "cs-uri-stem";
    pub const URI_QUERY: &str = "cs-uri-query";
    pub const USERNAME: &str = "cs-username";
    pub const CLIENT_IP: &str = "c-ip";
    pub const USER_AGENT: &str = "cs(User-Agent)";
    pub const PORT: &str = "s-port";
    pub const STATUS: &str = "sc-status";
    pub const SUB_STATUS: &str = "sc-substatus";
    pub const TIME_TAKEN: &str = "time-taken";
    pub const BYTES_SENT: &str = "sc-bytes";
}

/// Counters kept while streaming, for the load summary and trace output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseCounters {
    /// Physical lines read, including comments and blanks.
    pub lines_read: usize,
    /// Data lines turned into records.
    pub parsed: usize,
    /// Data lines dropped (no schema yet, too few columns).
    pub dropped: usize,
    /// `#Fields:` directives seen.
    pub schemas_seen: usize,
}

/// Streaming parser over any buffered reader.
///
/// Yields `Ok(record)` per accepted data line, in input order. An `Err` is
/// only produced for a read failure, after which the iterator is fused.
pub struct LogParser<R> {
    reader: R,
    schema: Option<FieldSchema>,
    buf: Vec<u8>,
    counters: ParseCounters,
    finished: bool,
}

impl LogParser<BufReader<File>> {
    /// Open `path` for streaming.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| file_err(path, e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LogParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            schema: None,
            buf: Vec::with_capacity(512),
            counters: ParseCounters::default(),
            finished: false,
        }
    }

    pub fn counters(&self) -> ParseCounters {
        self.counters
    }

    /// Read the next physical line. Invalid UTF-8 is replaced rather than
    /// rejected. Returns `Ok(false)` at end of input.
    fn read_line(&mut self) -> std::io::Result<bool> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        Ok(n > 0)
    }
}

impl<R: BufRead> Iterator for LogParser<R> {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.read_line() {
                Ok(true) => {}
                Ok(false) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(IisLensError::Io(e)));
                }
            }
            self.counters.lines_read += 1;
            let line_no = self.counters.lines_read;

            let text = String::from_utf8_lossy(&self.buf);
            let line = text.trim_end_matches(['\r', '\n']);

            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with(COMMENT_PREFIX) {
                if let Some(schema) = FieldSchema::from_directive(line) {
                    tracing::debug!(
                        "Line {}: new field layout with {} columns",
                        line_no,
                        schema.len()
                    );
                    self.schema = Some(schema);
                    self.counters.schemas_seen += 1;
                }
                continue;
            }

            let Some(schema) = self.schema.as_ref() else {
                self.counters.dropped += 1;
                tracing::trace!("Line {}: data before any #Fields directive", line_no);
                continue;
            };

            match parse_line(line, schema) {
                Ok(record) => {
                    self.counters.parsed += 1;
                    return Some(Ok(record));
                }
                Err(message) => {
                    self.counters.dropped += 1;
                    let err = IisLensError::LineParse {
                        line: line_no,
                        message,
                    };
                    tracing::trace!("{}", err);
                }
            }
        }
        None
    }
}

/// Decode one data line against `schema`.
///
/// Columns are split on single spaces without collapsing runs, so an empty
/// value still takes a position. Lines with fewer columns than the schema
/// declares are rejected. Individual bad values fall back to zero/empty.
pub fn parse_line(line: &str, schema: &FieldSchema) -> std::result::Result<LogRecord, String> {
    use fields::*;

    let columns: Vec<&str> = line.split(COLUMN_SEPARATOR).collect();
    if columns.len() < schema.len() {
        return Err(format!(
            "expected {} columns, found {}",
            schema.len(),
            columns.len()
        ));
    }

    let value = |name: &str| schema.value(&columns, name);

    Ok(LogRecord {
        timestamp: parse_log_timestamp(value(DATE), value(TIME)),
        method: value(METHOD).to_owned(),
        uri_stem: value(URI_STEM).to_owned(),
        uri_query: value(URI_QUERY).to_owned(),
        port: parse_or_zero(value(PORT)),
        username: value(USERNAME).to_owned(),
        client_ip: value(CLIENT_IP).to_owned(),
        user_agent: value(USER_AGENT).replace('+', " "),
        status_code: parse_or_zero(value(STATUS)),
        sub_status: parse_or_zero(value(SUB_STATUS)),
        time_taken_ms: parse_or_zero(value(TIME_TAKEN)),
        bytes_sent: parse_or_zero(value(BYTES_SENT)),
    })
}

/// Parse a numeric column, treating anything unparseable (including IIS's
/// `-` placeholder) as zero.
fn parse_or_zero<T: std::str::FromStr + Default>(raw: &str) -> T {
    raw.trim().parse().unwrap_or_default()
}

/// Parse every record from `reader`, keeping input order.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<Vec<LogRecord>> {
    LogParser::new(reader).collect()
}

/// Parse every record from the file at `path`.
///
/// # Errors
/// Returns [`IisLensError::FileAccess`] if the file cannot be opened, or
/// [`IisLensError::Io`] if reading fails part-way.
pub fn parse_file(path: &Path) -> Result<Vec<LogRecord>> {
    let mut parser = LogParser::open(path)?;
    let records = parser.by_ref().collect::<Result<Vec<_>>>()?;
    let c = parser.counters();
    tracing::debug!(
        "Parsed {} records from {} ({} lines, {} dropped)",
        c.parsed,
        path.display(),
        c.lines_read,
        c.dropped
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "#Software: Microsoft Internet Information Services 10.0\n\
#Version: 1.0\n\
#Date: 2024-01-01 00:00:00\n\
#Fields: date time s-ip cs-method cs-uri-stem cs-uri-query s-port cs-username c-ip cs(User-Agent) cs(Referer) sc-status sc-substatus sc-win32-status time-taken\n";

    fn parse(text: &str) -> Vec<LogRecord> {
        parse_reader(Cursor::new(text.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_full_line_decodes_every_field() {
        let text = format!(
            "{HEADER}2024-01-01 10:00:00 10.0.0.1 GET /api/users id=7 443 alice 192.168.1.5 Mozilla/5.0+(Windows) - 200 0 0 125\n"
        );
        let records = parse(&text);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(
            r.timestamp.unwrap().to_string(),
            "2024-01-01 10:00:00"
        );
        assert_eq!(r.method, "GET");
        assert_eq!(r.uri_stem, "/api/users");
        assert_eq!(r.uri_query, "id=7");
        assert_eq!(r.port, 443);
        assert_eq!(r.username, "alice");
        assert_eq!(r.client_ip, "192.168.1.5");
        assert_eq!(r.user_agent, "Mozilla/5.0 (Windows)");
        assert_eq!(r.status_code, 200);
        assert_eq!(r.sub_status, 0);
        assert_eq!(r.time_taken_ms, 125);
        // sc-bytes not declared in this layout
        assert_eq!(r.bytes_sent, 0);
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let text = format!(
            "{HEADER}\n   \n#Remark: restart\n2024-01-01 10:00:00 10.0.0.1 GET / - 80 - 1.1.1.1 UA - 200 0 0 1\n"
        );
        assert_eq!(parse(&text).len(), 1);
    }

    #[test]
    fn test_data_before_schema_is_skipped() {
        let text = "2024-01-01 10:00:00 GET /\n#Fields: date time cs-method cs-uri-stem\n2024-01-01 10:00:01 GET /ok\n";
        let records = parse(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uri_stem, "/ok");
    }

    #[test]
    fn test_short_line_is_dropped() {
        let text = format!("{HEADER}2024-01-01 10:00:00 10.0.0.1 GET /short\n");
        let mut parser = LogParser::new(Cursor::new(text.into_bytes()));
        assert!(parser.next().is_none());
        assert_eq!(parser.counters().dropped, 1);
        assert_eq!(parser.counters().parsed, 0);
    }

    #[test]
    fn test_empty_column_keeps_its_position() {
        // Two spaces between method and status: the stem column is empty.
        let text = "#Fields: cs-method cs-uri-stem sc-status\nGET  404\n";
        let records = parse(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uri_stem, "");
        assert_eq!(records[0].status_code, 404);
    }

    #[test]
    fn test_bad_numbers_and_dates_degrade_to_zero() {
        let text = "#Fields: date time sc-status time-taken sc-bytes s-port\n2024-13-01 10:00:00 abc - 99999999999999999999 x\n";
        let records = parse(text);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert!(r.timestamp.is_none());
        assert_eq!(r.status_code, 0);
        assert_eq!(r.time_taken_ms, 0);
        assert_eq!(r.bytes_sent, 0);
        assert_eq!(r.port, 0);
    }

    #[test]
    fn test_out_of_range_and_negative_numbers_are_kept() {
        let text = "#Fields: sc-status time-taken s-port\n70000 -5 -1\n";
        let records = parse(text);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.status_code, 70000);
        assert!(r.is_error());
        assert_eq!(r.time_taken_ms, -5);
        assert_eq!(r.port, -1);
    }

    #[test]
    fn test_new_directive_replaces_layout() {
        let text = "#Fields: cs-method cs-uri-stem\nGET /one\n#Fields: cs-uri-stem cs-method sc-status\n/two POST 201\n";
        let records = parse(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].method, "GET");
        assert_eq!(records[0].status_code, 0);
        assert_eq!(records[1].method, "POST");
        assert_eq!(records[1].uri_stem, "/two");
        assert_eq!(records[1].status_code, 201);
    }

    #[test]
    fn test_extra_columns_are_accepted() {
        let text = "#Fields: cs-method\nGET extra columns here\n";
        assert_eq!(parse(text).len(), 1);
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "#Fields: cs-method sc-status\r\nGET 200\r\n";
        let records = parse(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status_code, 200);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let mut bytes = b"#Fields: cs-method cs-uri-stem\nGET /caf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"\n");
        let records = parse_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].uri_stem.starts_with("/caf"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = format!(
            "{HEADER}2024-01-01 10:00:00 10.0.0.1 GET /a - 80 - 1.1.1.1 UA - 200 0 0 5\n2024-01-01 10:00:01 10.0.0.1 POST /b - 80 - 1.1.1.2 UA - 500 0 0 9\n"
        );
        assert_eq!(parse(&text), parse(&text));
    }

    #[test]
    fn test_missing_file_is_file_access_error() {
        let path = std::env::temp_dir().join("iislens_definitely_missing_u_ex.log");
        let err = parse_file(&path).unwrap_err();
        assert!(matches!(err, IisLensError::FileAccess { .. }));
    }
}
