//! Unified error types for IISLens.
//!
//! All fallible operations throughout the codebase return `Result<T, IisLensError>`.
//! Per-line parse failures are recovered inside the parser and never reach
//! the caller; everything else propagates via the `?` operator.

use std::path::PathBuf;

/// Unified error type used throughout IISLens.
#[derive(Debug, thiserror::Error)]
pub enum IisLensError {
    /// The log file could not be opened or read.
    #[error("Cannot read '{}': {source}", path.display())]
    FileAccess {
        /// Path the caller asked for.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A single data line could not be turned into a record. The parser
    /// drops the line and keeps going; this variant only exists so the
    /// reason can be traced.
    #[error("Line {line}: {message}")]
    LineParse { line: usize, message: String },

    /// Export (CSV or JSON) failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// A filter preset file could not be read, parsed or written.
    #[error("Preset error: {0}")]
    Preset(String),

    /// User-supplied input (date, clock, search type) was rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A background worker thread could not be started.
    #[error("Failed to spawn {0} thread")]
    ThreadSpawn(&'static str),

    /// Catch-all for I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IisLensError>;

/// Wrap an I/O error with the path that triggered it.
pub fn file_err(path: impl Into<PathBuf>, source: std::io::Error) -> IisLensError {
    IisLensError::FileAccess {
        path: path.into(),
        source,
    }
}
