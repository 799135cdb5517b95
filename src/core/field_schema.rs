//! Column layout declared by a `#Fields:` directive.

use std::collections::HashMap;

use crate::util::constants::FIELDS_DIRECTIVE;

/// Mapping from W3C field name to zero-based column index.
///
/// Built from a single directive line; a later directive replaces it
/// wholesale rather than merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    index: HashMap<String, usize>,
}

impl FieldSchema {
    /// Parse a `#Fields:` line. Returns `None` if `line` is not that
    /// directive.
    ///
    /// Field names are the tokens after the prefix. Any run of whitespace,
    /// tabs included, separates names. When a name is declared twice the later column wins.
    pub fn from_directive(line: &str) -> Option<Self> {
        let rest = line.strip_prefix(FIELDS_DIRECTIVE)?;
        let mut schema = FieldSchema::default();
        for (i, name) in rest.split_whitespace().enumerate() {
            schema.index.insert(name.to_owned(), i);
        }
        Some(schema)
    }

    /// Column index for `name`, if declared.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Number of distinct field names. A data line needs at least this
    /// many columns to be accepted.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Look up `name` in `columns`, returning `""` when the field is not
    /// declared or the line is too short.
    pub fn value<'a>(&self, columns: &[&'a str], name: &str) -> &'a str {
        self.column(name)
            .and_then(|i| columns.get(i).copied())
            .unwrap_or("")
    }
}
