//! Filename-derived provisional metadata and the async extraction job.
//!
//! Every job resolves a full `ExtractionOutcome` even when the external tool
//! fails: the filename supplies a provisional title, a detected two-digit
//! counter, and possibly a trailing year token, and tool fields supersede
//! those provisionals only when present.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use tokio::task::JoinHandle;

use super::exiftool::{MetadataTool, ToolFields};

/// Two leading digits followed by a separator, e.g. `07_`, `12-`, `03.`.
static COUNTER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})[ _\-.]").unwrap());

/// Where an extraction job came from, and which Document slot its outcome
/// must be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobContext {
    pub category_ordinal: usize,
    pub doc_index: usize,
    /// Fresh manual selections never feed the category's max-counter
    /// tracker; scan-discovered files do.
    pub is_new_selection: bool,
}

/// Resolved metadata for one document after the fallback chain has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub title: String,
    /// `None` is the unknown-year sentinel.
    pub year: Option<String>,
    /// `None` means the tool reported nothing; the caller falls back to
    /// folder context or the generic default.
    pub category: Option<String>,
    pub detected_counter: u32,
}

/// Split a two-digit counter prefix off a base name. Returns the counter
/// (0 = none) and the remainder with the separator stripped. A `00` prefix
/// counts as no counter, matching the positive-integer rule everywhere else.
pub fn parse_counter_prefix(stem: &str) -> (u32, &str) {
    if let Some(caps) = COUNTER_PREFIX.captures(stem) {
        if let Ok(counter) = caps[1].parse::<u32>() {
            if counter > 0 {
                return (counter, &stem[3..]);
            }
        }
    }
    (0, stem)
}

/// The last `_`-delimited token of the stem, if it is exactly four ASCII
/// digits. `paper_2023` → `2023`; `paper_123` and `paper2023` → none.
pub fn parse_trailing_year(stem: &str) -> Option<&str> {
    stem.rsplit('_')
        .next()
        .filter(|token| token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()))
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Run the fallback chain for one file: tool fields supersede
/// filename-derived provisionals; the year falls back to a trailing token,
/// then to the unknown-year sentinel.
pub fn resolve_outcome(stem: &str, fields: Option<&ToolFields>) -> ExtractionOutcome {
    let (detected_counter, remainder) = parse_counter_prefix(stem);
    let provisional_title = if detected_counter > 0 { remainder } else { stem };

    let title = fields
        .and_then(|f| f.title.clone())
        .unwrap_or_else(|| provisional_title.to_string());

    let year = fields
        .and_then(|f| f.year.clone())
        .or_else(|| parse_trailing_year(stem).map(str::to_string));

    let category = fields.and_then(|f| f.category.clone());

    ExtractionOutcome {
        title,
        year,
        category,
        detected_counter,
    }
}

/// Launch one extraction job. The subprocess runs without blocking the
/// caller; the outcome is reported through the returned handle. A tool
/// failure is logged and degrades to filename-derived fallbacks — the
/// document stays usable with best-effort values.
pub fn spawn_extraction(
    tool: Arc<dyn MetadataTool>,
    path: PathBuf,
    ctx: JobContext,
) -> JoinHandle<(JobContext, ExtractionOutcome)> {
    tokio::spawn(async move {
        let stem = file_stem(&path);
        let fields = match tool.read_fields(&path).await {
            Ok(fields) => Some(fields),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Metadata read failed, keeping filename-derived fallbacks"
                );
                None
            }
        };
        (ctx, resolve_outcome(&stem, fields.as_ref()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_prefix_with_underscore() {
        assert_eq!(parse_counter_prefix("07_My Paper"), (7, "My Paper"));
    }

    #[test]
    fn counter_prefix_with_other_separators() {
        assert_eq!(parse_counter_prefix("12-Name"), (12, "Name"));
        assert_eq!(parse_counter_prefix("03.Name"), (3, "Name"));
        assert_eq!(parse_counter_prefix("42 Name"), (42, "Name"));
    }

    #[test]
    fn single_digit_prefix_is_not_a_counter() {
        assert_eq!(parse_counter_prefix("7_Name"), (0, "7_Name"));
    }

    #[test]
    fn zero_prefix_is_not_a_counter() {
        assert_eq!(parse_counter_prefix("00_Name"), (0, "00_Name"));
    }

    #[test]
    fn digits_without_separator_are_not_a_counter() {
        assert_eq!(parse_counter_prefix("07Name"), (0, "07Name"));
    }

    #[test]
    fn trailing_year_token() {
        assert_eq!(parse_trailing_year("paper_2023"), Some("2023"));
        assert_eq!(parse_trailing_year("07_deep_dive_1999"), Some("1999"));
    }

    #[test]
    fn trailing_year_requires_four_digits() {
        assert_eq!(parse_trailing_year("paper_123"), None);
        assert_eq!(parse_trailing_year("paper_20234"), None);
        assert_eq!(parse_trailing_year("paper_202x"), None);
    }

    #[test]
    fn trailing_year_requires_underscore_delimiting() {
        assert_eq!(parse_trailing_year("paper2023"), None);
        // A bare four-digit stem is its own last token.
        assert_eq!(parse_trailing_year("2023"), Some("2023"));
    }

    #[test]
    fn tool_fields_supersede_filename() {
        let fields = ToolFields {
            title: Some("Proper Title".to_string()),
            year: Some("2001".to_string()),
            category: Some("Articles".to_string()),
        };
        let outcome = resolve_outcome("07_provisional_1999", Some(&fields));
        assert_eq!(outcome.title, "Proper Title");
        assert_eq!(outcome.year.as_deref(), Some("2001"));
        assert_eq!(outcome.category.as_deref(), Some("Articles"));
        assert_eq!(outcome.detected_counter, 7);
    }

    #[test]
    fn missing_tool_year_falls_back_to_trailing_token() {
        let fields = ToolFields {
            title: Some("Proper Title".to_string()),
            year: None,
            category: None,
        };
        let outcome = resolve_outcome("report_2023", Some(&fields));
        assert_eq!(outcome.year.as_deref(), Some("2023"));
    }

    #[test]
    fn no_year_anywhere_is_unknown() {
        let outcome = resolve_outcome("report_final", None);
        assert_eq!(outcome.year, None);
    }

    #[test]
    fn tool_failure_keeps_filename_fallbacks() {
        let outcome = resolve_outcome("07_deep_dive_1999", None);
        assert_eq!(outcome.title, "deep_dive_1999");
        assert_eq!(outcome.year.as_deref(), Some("1999"));
        assert_eq!(outcome.category, None);
        assert_eq!(outcome.detected_counter, 7);
    }

    #[test]
    fn stem_without_counter_is_whole_title() {
        let outcome = resolve_outcome("my paper", None);
        assert_eq!(outcome.title, "my paper");
        assert_eq!(outcome.detected_counter, 0);
    }
}
