//! The in-memory record for one catalogued file plus its pending edits.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Category text used when neither the metadata tool nor folder context
/// supplies one (e.g. a manually selected file before any folder exists).
pub const FALLBACK_CATEGORY: &str = "General";

/// Placeholder title shown while an extraction job is in flight.
pub const LOADING_TITLE: &str = "Loading…";

/// One catalogued file and its editable metadata.
///
/// The file itself lives outside the process: `source_path` is a reference,
/// never an open handle. `year` is `None` until either the metadata tool or
/// the filename supplies one — the unknown-year sentinel of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub source_path: PathBuf,
    pub title: String,
    pub year: Option<String>,
    pub category: String,
    /// Explicit user-entered counter; always wins when positive.
    pub manual_counter: Option<u32>,
    /// Two-digit prefix parsed from the original filename (0 = none).
    pub detected_counter: u32,
    /// The value currently driving display ordering; updated live as the
    /// user edits or as extraction completes.
    pub current_counter_value: u32,
    /// Base name (no extension) at discovery time. Idempotence key: a save
    /// only archives the original when the canonical name differs from this.
    pub original_base_name: Option<String>,
    /// Cleared-loading-placeholder flag, set once extraction has resolved.
    pub ready: bool,
}

impl Document {
    /// A document found by a folder scan. Its base name is recorded so a
    /// later save can tell whether the canonical name actually changed.
    pub fn discovered(source_path: PathBuf) -> Self {
        let original_base_name = stem_of(&source_path);
        Self::placeholder(source_path, original_base_name)
    }

    /// A freshly user-selected document. No discovery base name is recorded:
    /// the first save always produces (and archives toward) a canonical copy.
    pub fn selected(source_path: PathBuf) -> Self {
        Self::placeholder(source_path, None)
    }

    fn placeholder(source_path: PathBuf, original_base_name: Option<String>) -> Self {
        Self {
            source_path,
            title: LOADING_TITLE.to_string(),
            year: None,
            category: String::new(),
            manual_counter: None,
            detected_counter: 0,
            current_counter_value: 0,
            original_base_name,
            ready: false,
        }
    }

    /// True once title, year, and category are all present — the bar a
    /// document must clear before it can be organized.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && self.year.as_deref().is_some_and(|y| !y.trim().is_empty())
            && !self.category.trim().is_empty()
    }
}

pub(crate) fn stem_of(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}
