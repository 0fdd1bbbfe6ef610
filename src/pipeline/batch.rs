//! Batch regime: the full discover→extract→organize→sequence cycle for
//! every person in a roster, under a hard cap on in-flight people.
//!
//! Admission is semaphore-gated: while fewer than the cap are active the
//! next queued person starts, and every started unit is awaited before the
//! batch is declared complete. One person's failure never aborts or starves
//! the others; it lands in the summary instead.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::models::Category;
use crate::progress::ProgressReporter;

use super::error::PipelineError;
use super::exiftool::MetadataTool;
use super::organize::organize_catalog;
use super::reconcile::reconcile_person;
use super::sequence::{sequence_report, ReportSequence};

pub const DEFAULT_MAX_CONCURRENT: usize = 4;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub root: PathBuf,
    pub categories: Vec<Category>,
    /// Hard cap on concurrently in-flight per-person cycles.
    pub max_concurrent: usize,
}

/// Result of one person's completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PersonOutcome {
    pub person: String,
    pub organized: usize,
    pub skipped: usize,
    pub sequence: ReportSequence,
}

/// Outcome of a whole batch run. Partial success is the normal shape:
/// failures are per-person and listed, not fatal.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub succeeded: Vec<PersonOutcome>,
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }
}

/// Run the full cycle for every person in the roster.
pub async fn run_batch(
    tool: Arc<dyn MetadataTool>,
    roster: Vec<String>,
    config: BatchConfig,
    progress: Arc<ProgressReporter>,
) -> BatchSummary {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let started = std::time::Instant::now();

    tracing::info!(
        %run_id,
        people = roster.len(),
        cap = config.max_concurrent,
        "Batch starting"
    );

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let config = Arc::new(config);
    let mut units = JoinSet::new();

    for person in roster {
        let semaphore = semaphore.clone();
        let tool = tool.clone();
        let config = config.clone();
        let progress = progress.clone();

        units.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    return (person, Err(PipelineError::Tool(format!(
                        "admission queue closed: {e}"
                    ))));
                }
            };
            let result = run_person(tool, &config, &person, &progress).await;
            (person, result)
        });
    }

    let mut succeeded = Vec::new();
    let mut failed: Vec<(String, String)> = Vec::new();

    while let Some(joined) = units.join_next().await {
        match joined {
            Ok((person, Ok(outcome))) => {
                tracing::info!(
                    person,
                    organized = outcome.organized,
                    skipped = outcome.skipped,
                    "Person cycle complete"
                );
                succeeded.push(outcome);
            }
            Ok((person, Err(e))) => {
                tracing::error!(person, error = %e, "Person cycle failed");
                failed.push((person, e.to_string()));
            }
            Err(e) => {
                tracing::error!(error = %e, "Person cycle task did not complete");
                failed.push(("<unknown>".to_string(), e.to_string()));
            }
        }
    }

    // Stable roster-independent summary ordering.
    succeeded.sort_by(|a, b| a.person.cmp(&b.person));
    failed.sort();

    let summary = BatchSummary {
        run_id,
        started_at,
        duration_ms: started.elapsed().as_millis() as u64,
        succeeded,
        failed,
    };

    tracing::info!(
        %run_id,
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        duration_ms = summary.duration_ms,
        "Batch complete"
    );
    summary
}

/// One person's unit of work: the interactive regime's logic, start to end.
async fn run_person(
    tool: Arc<dyn MetadataTool>,
    config: &BatchConfig,
    person: &str,
    progress: &ProgressReporter,
) -> Result<PersonOutcome, PipelineError> {
    let mut catalog =
        reconcile_person(tool.clone(), &config.root, person, &config.categories).await?;
    progress.add_documents(catalog.document_count());

    let person_dir = config.root.join(person);
    let report = organize_catalog(tool.as_ref(), &person_dir, &mut catalog, || {
        progress.document_done();
    })
    .await;

    let sequence = sequence_report(&report.organized);

    Ok(PersonOutcome {
        person: person.to_string(),
        organized: report.organized.len(),
        skipped: report.skipped,
        sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::FakeTool;
    use crate::progress::{NullSink, ProgressReporter};
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

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

    fn seed_person(root: &Path, person: &str, files: &[&str]) {
        let dir = root.join(person).join("Articles");
        std::fs::create_dir_all(&dir).unwrap();
        for file in files {
            std::fs::write(dir.join(file), b"%PDF-1.4 stub").unwrap();
        }
    }

    fn reporter() -> Arc<ProgressReporter> {
        Arc::new(ProgressReporter::new(Box::new(NullSink)))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn cap_bounds_in_flight_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let roster: Vec<String> = (0..10).map(|i| format!("Person{i:02}")).collect();
        for person in &roster {
            seed_person(dir.path(), person, &["01_paper_2020.pdf"]);
        }

        let mut tool = FakeTool::new();
        tool.read_delay = Some(Duration::from_millis(25));
        let tool = Arc::new(tool);

        let summary = run_batch(
            tool.clone(),
            roster,
            BatchConfig {
                root: dir.path().to_path_buf(),
                categories: categories(&["Articles"]),
                max_concurrent: 4,
            },
            reporter(),
        )
        .await;

        assert_eq!(summary.succeeded.len(), 10);
        assert!(summary.failed.is_empty());
        // One read in flight per person at a time, so tool concurrency is a
        // faithful proxy for in-flight cycles.
        assert!(
            tool.max_active.load(Ordering::SeqCst) <= 4,
            "no more than 4 cycles may be active at once"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn missing_person_folder_fails_only_that_unit() {
        let dir = tempfile::tempdir().unwrap();
        seed_person(dir.path(), "Ada", &["01_paper_2020.pdf"]);
        seed_person(dir.path(), "Grace", &["01_other_2021.pdf"]);
        // "Missing" has no folder at all.

        let summary = run_batch(
            Arc::new(FakeTool::new()),
            vec!["Ada".into(), "Missing".into(), "Grace".into()],
            BatchConfig {
                root: dir.path().to_path_buf(),
                categories: categories(&["Articles"]),
                max_concurrent: 2,
            },
            reporter(),
        )
        .await;

        assert_eq!(summary.succeeded.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "Missing");
        assert!(!summary.all_failed());
    }

    #[tokio::test]
    async fn zero_cap_is_clamped_to_one() {
        let dir = tempfile::tempdir().unwrap();
        seed_person(dir.path(), "Ada", &["01_paper_2020.pdf"]);

        let summary = run_batch(
            Arc::new(FakeTool::new()),
            vec!["Ada".into()],
            BatchConfig {
                root: dir.path().to_path_buf(),
                categories: categories(&["Articles"]),
                max_concurrent: 0,
            },
            reporter(),
        )
        .await;
        assert_eq!(summary.succeeded.len(), 1);
    }

    #[tokio::test]
    async fn outcome_carries_the_sequence() {
        let dir = tempfile::tempdir().unwrap();
        seed_person(
            dir.path(),
            "Ada",
            &["01_first_2020.pdf", "02_second_2021.pdf"],
        );

        let summary = run_batch(
            Arc::new(FakeTool::new()),
            vec!["Ada".into()],
            BatchConfig {
                root: dir.path().to_path_buf(),
                categories: categories(&["Articles"]),
                max_concurrent: 1,
            },
            reporter(),
        )
        .await;

        let outcome = &summary.succeeded[0];
        assert_eq!(outcome.organized, 2);
        assert_eq!(outcome.sequence.entries.len(), 2);
        assert_eq!(outcome.sequence.entries[0].global_index, 1);
        assert_eq!(outcome.sequence.entries[1].global_index, 2);
    }
}
