//! Export of the filtered view to CSV and JSON.

pub mod csv_export;
pub mod json_export;

use std::path::Path;

use crate::util::error::{IisLensError, Result};

/// Check that `path` can be written before any work is done.
///
/// The parent directory must exist and must not be read-only. A bare file
/// name resolves against the current directory.
///
/// # Errors
/// Returns [`IisLensError::Export`] describing what is wrong with the path.
pub fn validate_export_path(path: &Path) -> Result<()> {
    if path.file_name().is_none() {
        return Err(IisLensError::Export(format!(
            "'{}' does not name a file",
            path.display()
        )));
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let meta = std::fs::metadata(parent).map_err(|_| {
        IisLensError::Export(format!(
            "Output directory '{}' does not exist",
            parent.display()
        ))
    })?;
    if !meta.is_dir() {
        return Err(IisLensError::Export(format!(
            "Output parent '{}' is not a directory",
            parent.display()
        )));
    }
    if meta.permissions().readonly() {
        return Err(IisLensError::Export(format!(
            "Output directory '{}' is read-only",
            parent.display()
        )));
    }
    Ok(())
}
