//! File organization: canonical names, copies, metadata stamping, archival.
//!
//! A save is idempotent by construction: the canonical name is a pure
//! function of counter, category, and year, the copy overwrites its target,
//! and the original is archived only when the canonical name actually
//! changed since discovery.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::models::{Document, PersonCatalog};

use super::error::PipelineError;
use super::exiftool::{MetadataTool, WrittenFields};

/// Placeholder used when sanitizing leaves nothing usable.
pub const UNTITLED: &str = "untitled";

/// Subdirectory that receives superseded originals.
pub const ARCHIVE_DIR: &str = "old_files";

/// Sanitize a text component for filesystem use: path-hazardous characters
/// and whitespace become `_`, runs of `_` collapse, leading/trailing `_`
/// are stripped. Accented and other non-ASCII letters pass through.
pub fn sanitize_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_separator = false;

    for c in input.chars() {
        let hazardous = matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            || c.is_whitespace();
        if hazardous {
            if !last_was_separator {
                out.push('_');
            }
            last_was_separator = true;
        } else {
            out.push(c);
            last_was_separator = false;
        }
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// The deterministic `NN_category_year` base name (no extension).
pub fn canonical_base_name(counter: u32, category: &str, year: &str) -> String {
    format!("{counter:02}_{}_{}", sanitize_component(category), year)
}

/// One successfully organized document, as the sequencer consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizedDocument {
    pub category: String,
    pub counter: u32,
    pub title: String,
    pub year: String,
    pub path: PathBuf,
}

/// Produce the canonical on-disk copy for one document and retire the stale
/// original when the canonical name changed.
///
/// The copy overwrites any file already at the canonical path; a stamp
/// failure keeps the copy (no rollback); an archival failure is logged but
/// does not undo the save.
pub async fn organize_document(
    tool: &dyn MetadataTool,
    category_dir: &Path,
    doc: &Document,
    counter: u32,
) -> Result<OrganizedDocument, PipelineError> {
    let title = doc.title.trim();
    if title.is_empty() {
        return Err(PipelineError::Incomplete {
            path: doc.source_path.clone(),
            field: "title",
        });
    }
    let category = doc.category.trim();
    if category.is_empty() {
        return Err(PipelineError::Incomplete {
            path: doc.source_path.clone(),
            field: "category",
        });
    }
    let year = doc
        .year
        .as_deref()
        .map(str::trim)
        .filter(|y| !y.is_empty())
        .ok_or_else(|| PipelineError::Incomplete {
            path: doc.source_path.clone(),
            field: "year",
        })?;

    let base = canonical_base_name(counter, category, year);

    tokio::fs::create_dir_all(category_dir)
        .await
        .map_err(|e| PipelineError::io(category_dir, e))?;

    let dest = category_dir.join(format!("{base}.pdf"));
    // A re-save of an already-canonical file has source == dest; copying a
    // file onto itself would truncate it.
    if dest != doc.source_path {
        tokio::fs::copy(&doc.source_path, &dest)
            .await
            .map_err(|e| PipelineError::io(&doc.source_path, e))?;
    }

    let written = WrittenFields {
        title: title.to_string(),
        year: year.to_string(),
        category: category.to_string(),
    };
    if let Err(e) = tool.write_fields(&dest, &written).await {
        tracing::warn!(
            path = %dest.display(),
            error = %e,
            "Metadata stamp failed; organized copy kept as-is"
        );
    }

    let name_changed = doc.original_base_name.as_deref() != Some(base.as_str());
    if name_changed && tokio::fs::try_exists(&doc.source_path).await.unwrap_or(false) {
        match archive_original(category_dir, &doc.source_path).await {
            Ok(archived) => {
                tracing::info!(
                    from = %doc.source_path.display(),
                    to = %archived.display(),
                    "Archived superseded original"
                );
            }
            Err(e) => {
                tracing::warn!(
                    path = %doc.source_path.display(),
                    error = %e,
                    "Could not archive superseded original"
                );
            }
        }
    }

    Ok(OrganizedDocument {
        category: category.to_string(),
        counter,
        title: title.to_string(),
        year: year.to_string(),
        path: dest,
    })
}

/// Move a file into the category's `old_files` subdirectory, keeping its
/// base name. Also used when a document is removed from its section.
pub async fn archive_original(
    category_dir: &Path,
    source: &Path,
) -> Result<PathBuf, PipelineError> {
    let archive_dir = category_dir.join(ARCHIVE_DIR);
    tokio::fs::create_dir_all(&archive_dir)
        .await
        .map_err(|e| PipelineError::io(&archive_dir, e))?;

    let name = source
        .file_name()
        .ok_or_else(|| PipelineError::Incomplete {
            path: source.to_path_buf(),
            field: "file name",
        })?;
    let dest = archive_dir.join(name);

    tokio::fs::rename(source, &dest)
        .await
        .map_err(|e| PipelineError::io(source, e))?;
    Ok(dest)
}

/// Remove a document from its section and archive its file. The in-memory
/// model is dropped either way; a missing file just skips the move.
pub async fn retire_document(
    catalog: &mut PersonCatalog,
    person_dir: &Path,
    ordinal: usize,
    doc_index: usize,
) -> Option<Document> {
    let category_name = catalog.sections.get(ordinal)?.category.name.clone();
    let doc = catalog.remove_document(ordinal, doc_index)?;

    if tokio::fs::try_exists(&doc.source_path).await.unwrap_or(false) {
        let category_dir = person_dir.join(&category_name);
        if let Err(e) = archive_original(&category_dir, &doc.source_path).await {
            tracing::warn!(
                path = %doc.source_path.display(),
                error = %e,
                "Could not archive removed document"
            );
        }
    }
    Some(doc)
}

/// Counts for one person's organize pass. Skips never abort siblings.
#[derive(Debug, Default, Clone, Serialize)]
pub struct OrganizeReport {
    pub organized: Vec<OrganizedDocument>,
    pub skipped: usize,
}

/// Organize every document in the catalog, assigning final counters section
/// by section. Per-document failures are logged and counted, and processing
/// continues with the next document.
pub async fn organize_catalog(
    tool: &dyn MetadataTool,
    person_dir: &Path,
    catalog: &mut PersonCatalog,
    mut on_document: impl FnMut(),
) -> OrganizeReport {
    let mut report = OrganizeReport::default();

    for section in &mut catalog.sections {
        let category_dir = person_dir.join(&section.category.name);
        for doc_index in 0..section.documents.len() {
            let counter = section.assign_counter(doc_index);
            let doc = &section.documents[doc_index];
            match organize_document(tool, &category_dir, doc, counter).await {
                Ok(organized) => report.organized.push(organized),
                Err(e) => {
                    tracing::warn!(
                        path = %doc.source_path.display(),
                        error = %e,
                        "Skipping document"
                    );
                    report.skipped += 1;
                }
            }
            on_document();
        }
    }

    report
}
