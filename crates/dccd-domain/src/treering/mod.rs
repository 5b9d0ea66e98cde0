//! Raw tree-ring measurement file readers.
//!
//! An uploaded bundle references its measurement data through per-series
//! raw files; these readers turn such a file into TRiDaS values groups for
//! the import merge. The registry in [`reading_formats`] is also the
//! validation set for the bundle metadata's `values/format` field.

mod heidelberg;
mod tucson;

use std::path::Path;

use thiserror::Error;

use crate::tridas::TridasValues;

/// Errors while loading a raw measurement file.
#[derive(Debug, Error)]
pub enum TreeRingError {
    /// The requested format is not in the reading registry.
    #[error("unsupported tree-ring data format: {format}")]
    UnsupportedFormat { format: String },

    /// The file does not parse as the requested format.
    #[error("malformed {format} file {file}: {message}")]
    Parse {
        format: String,
        file: String,
        message: String,
    },

    /// Underlying file-system failure.
    #[error("tree-ring data file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tree-ring file operations.
pub type TreeRingResult<T> = Result<T, TreeRingError>;

/// Formats the readers understand, as accepted in bundle metadata.
const READING_FORMATS: [&str; 2] = ["Heidelberg", "Tucson"];

/// The reading formats supported for import.
pub fn reading_formats() -> &'static [&'static str] {
    &READING_FORMATS
}

/// Parsed contents of one raw measurement file.
///
/// A file yields groups for measurement series or for derived series
/// depending on what it declares (a Heidelberg chronology is derived
/// data); the merge asks for the flavour matching the series at hand.
#[derive(Debug, Clone, Default)]
pub struct TreeRingData {
    pub file_name: String,
    measurement_groups: Vec<TridasValues>,
    derived_groups: Vec<TridasValues>,
}

impl TreeRingData {
    pub(crate) fn for_measurement(file_name: String, groups: Vec<TridasValues>) -> Self {
        Self {
            file_name,
            measurement_groups: groups,
            derived_groups: Vec::new(),
        }
    }

    pub(crate) fn for_derived(file_name: String, groups: Vec<TridasValues>) -> Self {
        Self {
            file_name,
            measurement_groups: Vec::new(),
            derived_groups: groups,
        }
    }

    /// Values groups to merge into a measurement series.
    pub fn values_for_measurement_series(&self) -> &[TridasValues] {
        &self.measurement_groups
    }

    /// Values groups to merge into a derived series.
    pub fn values_for_derived_series(&self) -> &[TridasValues] {
        &self.derived_groups
    }
}

/// Loads and converts a raw measurement file.
pub fn load(path: &Path, format: &str) -> TreeRingResult<TreeRingData> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let text = std::fs::read_to_string(path)?;
    match format {
        "Heidelberg" => heidelberg::parse(&file_name, &text),
        "Tucson" => tucson::parse(&file_name, &text),
        other => Err(TreeRingError::UnsupportedFormat {
            format: other.to_string(),
        }),
    }
}
