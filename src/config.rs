//! Configuration lists and directory layout.
//!
//! The category list and the roster are plain newline-delimited UTF-8 files
//! (CRLF tolerated, blank lines ignored). A missing or empty list is a fatal
//! startup condition: nothing is scanned or moved before both load cleanly.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::Category;

/// Application-level constants
pub const APP_NAME: &str = "Dossier";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn default_log_filter() -> &'static str {
    "dossier=info"
}

/// Default library root: ~/Dossier (user-visible, overridable per CLI flag).
pub fn library_root() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Dossier")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("List file {0} contains no entries")]
    EmptyList(PathBuf),

    #[error("Duplicate category name: {0}")]
    DuplicateCategory(String),
}

fn read_list(path: &Path) -> Result<Vec<String>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let entries: Vec<String> = raw
        .lines()
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if entries.is_empty() {
        return Err(ConfigError::EmptyList(path.to_path_buf()));
    }
    Ok(entries)
}

/// Load the category list and assign ordinals in case-insensitive
/// alphabetical order. Duplicate names are rejected.
pub fn load_categories(path: &Path) -> Result<Vec<Category>, ConfigError> {
    let mut names = read_list(path)?;
    names.sort_by_key(|name| name.to_lowercase());

    for pair in names.windows(2) {
        if pair[0].eq_ignore_ascii_case(&pair[1]) {
            return Err(ConfigError::DuplicateCategory(pair[1].clone()));
        }
    }

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(ordinal, name)| Category { name, ordinal })
        .collect())
}

/// Load the roster of person names, in file order.
pub fn load_roster(path: &Path) -> Result<Vec<String>, ConfigError> {
    read_list(path)
}

/// One `<category>,<alias>` row of the counting tool's mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub category: String,
    pub alias: String,
}

/// Load the `<category>,<alias>` mapping used by the counting tool.
/// Malformed lines are skipped with a warning rather than failing the run.
pub fn load_alias_map(path: &Path) -> Result<Vec<AliasEntry>, ConfigError> {
    let lines = read_list(path)?;
    let mut entries = Vec::with_capacity(lines.len());

    for line in &lines {
        match line.split_once(',') {
            Some((category, alias)) if !category.trim().is_empty() && !alias.trim().is_empty() => {
                entries.push(AliasEntry {
                    category: category.trim().to_string(),
                    alias: alias.trim().to_string(),
                });
            }
            _ => {
                tracing::warn!(line, "Skipping malformed alias mapping line");
            }
        }
    }

    if entries.is_empty() {
        return Err(ConfigError::EmptyList(path.to_path_buf()));
    }
    Ok(entries)
}
