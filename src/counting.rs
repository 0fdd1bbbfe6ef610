//! Category-count aggregation: tag every PDF in each person's production
//! folder with the mapped categories its tool-reported category matches,
//! and emit the result as CSV for the statistics report.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::config::AliasEntry;
use crate::pipeline::exiftool::MetadataTool;
use crate::pipeline::reconcile::scan_category;
use crate::pipeline::PipelineError;

/// Sentinel for a PDF whose category matched nothing in the mapping.
pub const NO_CATEGORY: &str = "NoCategory";

/// Separator for multi-valued cells.
const LIST_SEPARATOR: &str = "|";

/// One output row: `Professor, PDF_File, Categories, CategoryAlias`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountRow {
    pub professor: String,
    pub pdf_file: String,
    pub categories: String,
    pub category_alias: String,
}

/// Match a tool-reported category string against the alias map:
/// case-insensitive substring match, zero or more hits, mapping order kept.
pub fn match_categories<'a>(
    tool_category: Option<&str>,
    aliases: &'a [AliasEntry],
) -> Vec<&'a AliasEntry> {
    let Some(reported) = tool_category else {
        return Vec::new();
    };
    let reported = reported.to_lowercase();
    aliases
        .iter()
        .filter(|entry| reported.contains(&entry.category.to_lowercase()))
        .collect()
}

fn row_for(person: &str, file_name: String, matches: Vec<&AliasEntry>) -> CountRow {
    if matches.is_empty() {
        return CountRow {
            professor: person.to_string(),
            pdf_file: file_name,
            categories: NO_CATEGORY.to_string(),
            category_alias: NO_CATEGORY.to_string(),
        };
    }
    CountRow {
        professor: person.to_string(),
        pdf_file: file_name,
        categories: matches
            .iter()
            .map(|m| m.category.as_str())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        category_alias: matches
            .iter()
            .map(|m| m.alias.as_str())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
    }
}

/// Scan each person's production category folder and build one row per PDF.
/// Tool read failures are logged and counted as `NoCategory`.
pub async fn collect_counts(
    tool: &dyn MetadataTool,
    root: &Path,
    roster: &[String],
    production_category: &str,
    aliases: &[AliasEntry],
) -> Result<Vec<CountRow>, PipelineError> {
    let mut rows = Vec::new();

    for person in roster {
        let dir = root.join(person).join(production_category);
        for path in scan_category(&dir).await? {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let tool_category = match tool.read_fields(&path).await {
                Ok(fields) => fields.category,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Category read failed, counting as NoCategory"
                    );
                    None
                }
            };

            let matches = match_categories(tool_category.as_deref(), aliases);
            rows.push(row_for(person, file_name, matches));
        }
    }

    Ok(rows)
}

/// Write the rows as CSV with the fixed header the downstream statistics
/// report expects.
pub fn write_csv<W: Write>(rows: &[CountRow], writer: W) -> Result<(), PipelineError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["Professor", "PDF_File", "Categories", "CategoryAlias"])
        .map_err(|e| PipelineError::Tool(format!("CSV write failed: {e}")))?;

    for row in rows {
        out.write_record([
            row.professor.as_str(),
            row.pdf_file.as_str(),
            row.categories.as_str(),
            row.category_alias.as_str(),
        ])
        .map_err(|e| PipelineError::Tool(format!("CSV write failed: {e}")))?;
    }

    out.flush()
        .map_err(|e| PipelineError::Tool(format!("CSV flush failed: {e}")))?;
    Ok(())
}
