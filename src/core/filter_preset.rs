//! Serialisable filter preset for named filter configurations.
//!
//! [`FilterPreset`] captures the user-visible fields of a
//! [`FilterCriteria`] in plain text form and is saved/loaded as a JSON
//! array via `serde`.

use std::path::Path;

use super::criteria::{FilterCriteria, SearchType};
use crate::util::error::{file_err, IisLensError, Result};
use crate::util::time::{parse_clock_input, parse_date_input};

/// A named, serialisable snapshot of the filter inputs.
///
/// Dates and times are stored as the strings a user would type
/// (`YYYY-MM-DD`, `HH:MM:SS`) so preset files stay hand-editable.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FilterPreset {
    /// Display name shown in the preset list.
    pub name: String,
    #[serde(default)]
    pub show_errors_only: bool,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default)]
    pub search_text: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub include_start_time: bool,
    #[serde(default)]
    pub include_end_time: bool,
}

impl FilterPreset {
    /// Create a preset from the current [`FilterCriteria`].
    pub fn from_criteria(name: &str, c: &FilterCriteria) -> Self {
        let date = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
        };
        let time = |t: Option<chrono::NaiveTime>| {
            t.map(|t| t.format("%H:%M:%S").to_string()).unwrap_or_default()
        };
        Self {
            name: name.to_owned(),
            show_errors_only: c.show_errors_only,
            search_type: c.search_type,
            search_text: c.search_text.clone(),
            start_date: date(c.start_date),
            start_time: time(c.start_time),
            end_date: date(c.end_date),
            end_time: time(c.end_time),
            include_start_time: c.include_start_time,
            include_end_time: c.include_end_time,
        }
    }

    /// Convert this preset into [`FilterCriteria`].
    ///
    /// # Errors
    /// Returns [`IisLensError::InvalidInput`] if a non-empty date or time
    /// string does not parse.
    pub fn to_criteria(&self) -> Result<FilterCriteria> {
        Ok(FilterCriteria {
            show_errors_only: self.show_errors_only,
            search_type: self.search_type,
            search_text: self.search_text.clone(),
            start_date: optional(&self.start_date, parse_date_input, "start date")?,
            start_time: optional(&self.start_time, parse_clock_input, "start time")?,
            end_date: optional(&self.end_date, parse_date_input, "end date")?,
            end_time: optional(&self.end_time, parse_clock_input, "end time")?,
            include_start_time: self.include_start_time,
            include_end_time: self.include_end_time,
        })
    }
}

/// Empty input is `None`; anything else must parse.
fn optional<T>(raw: &str, parse: fn(&str) -> Option<T>, what: &str) -> Result<Option<T>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse(raw)
        .map(Some)
        .ok_or_else(|| IisLensError::InvalidInput(format!("{what} '{raw}'")))
}

/// Read a JSON array of presets from `path`.
pub fn load_presets(path: &Path) -> Result<Vec<FilterPreset>> {
    let text = std::fs::read_to_string(path).map_err(|e| file_err(path, e))?;
    serde_json::from_str(&text)
        .map_err(|e| IisLensError::Preset(format!("{}: {e}", path.display())))
}

/// Write `presets` to `path` as pretty-printed JSON, replacing the file.
pub fn save_presets(presets: &[FilterPreset], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(presets)
        .map_err(|e| IisLensError::Preset(format!("serialise presets: {e}")))?;
    std::fs::write(path, json).map_err(|e| file_err(path, e))?;
    tracing::info!("Saved {} presets to {}", presets.len(), path.display());
    Ok(())
}

/// Find a preset by name, ignoring case.
pub fn find_preset<'a>(presets: &'a [FilterPreset], name: &str) -> Option<&'a FilterPreset> {
    presets.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_date_is_rejected() {
        let preset = FilterPreset {
            start_date: "2024-02-30".into(),
            ..FilterPreset::from_criteria("bad", &FilterCriteria::default())
        };
        assert!(matches!(
            preset.to_criteria(),
            Err(IisLensError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let preset: FilterPreset = serde_json::from_str(r#"{"name":"minimal"}"#).unwrap();
        assert_eq!(preset.to_criteria().unwrap(), FilterCriteria::default());
    }
}
