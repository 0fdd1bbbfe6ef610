//! Folder reconciliation: discover files, drive extraction jobs, apply
//! outcomes to the catalog.
//!
//! Scans are non-recursive and PDF-only; the `old_files` archive directory
//! is a subdirectory and therefore never re-ingested. Jobs for one person
//! run concurrently with no ordering guarantee between completions — each
//! outcome mutates only its own Document slot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;

use crate::models::document::FALLBACK_CATEGORY;
use crate::models::{Category, Document, PersonCatalog};

use super::error::PipelineError;
use super::extract::{spawn_extraction, ExtractionOutcome, JobContext};
use super::exiftool::MetadataTool;

/// List the PDF files directly inside one category folder, sorted by name
/// for deterministic ordering. A missing folder yields an empty list; the
/// interactive flow treats that as an empty section, not an error.
pub async fn scan_category(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PipelineError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| PipelineError::io(dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| PipelineError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"));
        if is_pdf {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Apply one job's outcome to its Document slot. Scan-sourced detected
/// counters feed the section's max-counter tracker; fresh selections do not.
pub fn apply_outcome(catalog: &mut PersonCatalog, ctx: &JobContext, outcome: ExtractionOutcome) {
    let Some(section) = catalog.section_mut(ctx.category_ordinal) else {
        return;
    };
    let folder_category = section.category.name.clone();

    {
        let Some(doc) = section.documents.get_mut(ctx.doc_index) else {
            return;
        };
        doc.title = outcome.title;
        doc.year = outcome.year;
        doc.category = outcome.category.unwrap_or(if ctx.is_new_selection {
            FALLBACK_CATEGORY.to_string()
        } else {
            folder_category
        });
        doc.detected_counter = outcome.detected_counter;
        doc.current_counter_value = outcome.detected_counter;
        doc.ready = true;
    }

    if !ctx.is_new_selection && outcome.detected_counter > 0 {
        section.observe_counter(outcome.detected_counter);
    }
}

/// Build a fresh catalog for one person: scan every category folder, create
/// loading-placeholder documents, run one extraction job per document, and
/// apply every outcome. Returns with `all_ready() == true`.
pub async fn reconcile_person(
    tool: Arc<dyn MetadataTool>,
    root: &Path,
    person: &str,
    categories: &[Category],
) -> Result<PersonCatalog, PipelineError> {
    let person_dir = root.join(person);
    if !person_dir.is_dir() {
        return Err(PipelineError::PersonFolderMissing(person_dir));
    }

    let mut catalog = PersonCatalog::new(person, categories);
    let mut handles = Vec::new();

    for section in &mut catalog.sections {
        let dir = person_dir.join(&section.category.name);
        for path in scan_category(&dir).await? {
            let ctx = JobContext {
                category_ordinal: section.category.ordinal,
                doc_index: section.documents.len(),
                is_new_selection: false,
            };
            section.documents.push(Document::discovered(path.clone()));
            handles.push(spawn_extraction(tool.clone(), path, ctx));
        }
    }

    tracing::debug!(
        person,
        documents = catalog.document_count(),
        "Folder scan complete, awaiting extraction jobs"
    );

    for joined in join_all(handles).await {
        match joined {
            Ok((ctx, outcome)) => apply_outcome(&mut catalog, &ctx, outcome),
            Err(e) => tracing::error!(error = %e, "Extraction task failed to complete"),
        }
    }

    Ok(catalog)
}

/// Add a freshly user-selected file to a category section and run its
/// extraction job. Unlike scanned files, it does not feed the section's
/// max-counter tracker.
pub async fn add_selected_document(
    tool: Arc<dyn MetadataTool>,
    catalog: &mut PersonCatalog,
    category_ordinal: usize,
    path: PathBuf,
) -> Result<(), PipelineError> {
    let section = catalog
        .section_mut(category_ordinal)
        .ok_or_else(|| PipelineError::Incomplete {
            path: path.clone(),
            field: "category section",
        })?;

    let ctx = JobContext {
        category_ordinal,
        doc_index: section.documents.len(),
        is_new_selection: true,
    };
    section.documents.push(Document::selected(path.clone()));

    match spawn_extraction(tool, path, ctx).await {
        Ok((ctx, outcome)) => {
            apply_outcome(catalog, &ctx, outcome);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Extraction task failed to complete");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::exiftool::ToolFields;
    use crate::pipeline::testing::FakeTool;

    fn categories(names: &[&str]) -> Vec<Category> {
        names
            .iter()
            .enumerate()
            .map(|(ordinal, name)| Category {
                name: name.to_string(),
                ordinal,
            })
            .collect()
    }

    fn touch(path: &Path) {
        std::fs::write(path, b"%PDF-1.4 stub").unwrap();
    }

    #[tokio::test]
    async fn scan_finds_only_pdfs_non_recursively() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.pdf"));
        touch(&dir.path().join("B.PDF"));
        touch(&dir.path().join("notes.txt"));
        std::fs::create_dir(dir.path().join("old_files")).unwrap();
        touch(&dir.path().join("old_files").join("archived.pdf"));

        let files = scan_category(dir.path()).await.unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["B.PDF", "a.pdf"]);
    }

    #[tokio::test]
    async fn scan_of_missing_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = scan_category(&dir.path().join("nope")).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn reconcile_missing_person_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Arc::new(FakeTool::new());
        let result =
            reconcile_person(tool, dir.path(), "Nobody", &categories(&["Articles"])).await;
        assert!(matches!(
            result,
            Err(PipelineError::PersonFolderMissing(_))
        ));
    }

    #[tokio::test]
    async fn reconcile_fills_documents_and_marks_ready() {
        let dir = tempfile::tempdir().unwrap();
        let articles = dir.path().join("Ada").join("Articles");
        std::fs::create_dir_all(&articles).unwrap();
        let paper = articles.join("07_early_work_2001.pdf");
        touch(&paper);

        let tool = Arc::new(FakeTool::new().with_fields(
            &paper,
            ToolFields {
                title: Some("Early Work".to_string()),
                year: None,
                category: None,
            },
        ));

        let catalog = reconcile_person(tool, dir.path(), "Ada", &categories(&["Articles"]))
            .await
            .unwrap();

        assert!(catalog.all_ready());
        let doc = &catalog.sections[0].documents[0];
        assert_eq!(doc.title, "Early Work");
        assert_eq!(doc.year.as_deref(), Some("2001"), "trailing-token fallback");
        assert_eq!(doc.category, "Articles", "folder-context fallback");
        assert_eq!(doc.detected_counter, 7);
        assert_eq!(catalog.sections[0].max_counter(), 7);
    }

    #[tokio::test]
    async fn tool_failure_leaves_best_effort_values() {
        let dir = tempfile::tempdir().unwrap();
        let articles = dir.path().join("Ada").join("Articles");
        std::fs::create_dir_all(&articles).unwrap();
        touch(&articles.join("12_fallback_study_1999.pdf"));

        let mut failing = FakeTool::new();
        failing.fail_reads = true;
        let catalog = reconcile_person(
            Arc::new(failing),
            dir.path(),
            "Ada",
            &categories(&["Articles"]),
        )
        .await
        .unwrap();

        let doc = &catalog.sections[0].documents[0];
        assert!(doc.ready, "document stays usable after a tool failure");
        assert_eq!(doc.title, "fallback_study_1999");
        assert_eq!(doc.year.as_deref(), Some("1999"));
        assert_eq!(doc.detected_counter, 12);
    }

    #[tokio::test]
    async fn scan_counters_feed_the_max_but_selections_do_not() {
        let dir = tempfile::tempdir().unwrap();
        let articles = dir.path().join("Ada").join("Articles");
        std::fs::create_dir_all(&articles).unwrap();
        touch(&articles.join("05_scanned.pdf"));

        let tool = Arc::new(FakeTool::new());
        let mut catalog = reconcile_person(
            tool.clone(),
            dir.path(),
            "Ada",
            &categories(&["Articles"]),
        )
        .await
        .unwrap();
        assert_eq!(catalog.sections[0].max_counter(), 5);

        // A freshly selected file with a higher-looking prefix.
        let loose = dir.path().join("09_loose.pdf");
        touch(&loose);
        add_selected_document(tool, &mut catalog, 0, loose)
            .await
            .unwrap();

        let doc = &catalog.sections[0].documents[1];
        assert_eq!(doc.detected_counter, 9);
        assert_eq!(doc.category, crate::models::document::FALLBACK_CATEGORY);
        assert_eq!(
            catalog.sections[0].max_counter(),
            5,
            "selection must not feed the max-counter tracker"
        );
    }

    #[tokio::test]
    async fn completions_apply_to_their_own_slots_regardless_of_order() {
        let dir = tempfile::tempdir().unwrap();
        let articles = dir.path().join("Ada").join("Articles");
        std::fs::create_dir_all(&articles).unwrap();
        for name in ["01_one.pdf", "02_two.pdf", "03_three.pdf"] {
            touch(&articles.join(name));
        }

        let tool = FakeTool::new();
        for (name, title) in [
            ("01_one.pdf", "One"),
            ("02_two.pdf", "Two"),
            ("03_three.pdf", "Three"),
        ] {
            tool.set_fields(
                articles.join(name),
                ToolFields {
                    title: Some(title.to_string()),
                    year: Some("2020".to_string()),
                    category: None,
                },
            );
        }

        let catalog = reconcile_person(
            Arc::new(tool),
            dir.path(),
            "Ada",
            &categories(&["Articles"]),
        )
        .await
        .unwrap();

        let titles: Vec<&str> = catalog.sections[0]
            .documents
            .iter()
            .map(|d| d.title.as_str())
            .collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        assert_eq!(catalog.sections[0].max_counter(), 3);
    }
}
