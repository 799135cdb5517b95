//! Application-wide constants for IISLens.
//!
//! Centralising magic numbers and configuration defaults here keeps the rest
//! of the codebase clean and makes tuning straightforward.

/// Prefix shared by every W3C directive and comment line.
pub const COMMENT_PREFIX: char = '#';

/// Directive that declares the column layout of the following data lines.
pub const FIELDS_DIRECTIVE: &str = "#Fields:";

/// Column separator used by IIS in both the directive and data lines.
pub const COLUMN_SEPARATOR: char = ' ';

/// Exact format of `date` + `' '` + `time` in a data line.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How many parsed records the loader accumulates before sending a batch.
/// Smaller batches give smoother progress; larger ones cost less overhead.
pub const PARSE_BATCH_SIZE: usize = 2_000;

/// Size of the channel used to send batches from the parser thread.
/// Bounded to apply back-pressure if the consumer falls behind.
pub const CHANNEL_BOUND: usize = 256;

/// The filter pass re-checks its cancel flag every this many records.
pub const CANCEL_CHECK_INTERVAL: usize = 4_096;

/// Placeholder reported as the most requested URL when nothing is retained.
pub const NO_URL_PLACEHOLDER: &str = "-";

/// Path fragment (case-insensitive) that marks a token endpoint hit.
pub const TOKEN_STEM_MARKER: &str = "/token";

/// Query fragment (case-insensitive) that marks a token endpoint hit.
pub const TOKEN_QUERY_MARKER: &str = "token";

/// Ceiling applied to an end date when no explicit time-of-day is included.
pub const END_OF_DAY: (u32, u32, u32) = (23, 59, 59);

/// Application display name used in banners and log output.
pub const APP_NAME: &str = "IISLens";

/// Application version string.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application data subdirectory name for logs.
pub const APP_DATA_DIR: &str = "IISLens";

/// Log subdirectory name under the app data directory.
pub const LOG_DIR: &str = "logs";

/// Log file name for persistent debug logging.
pub const LOG_FILE_NAME: &str = "iislens.log";

/// Maximum log file size in bytes before rotation (5 MB).
pub const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;
