//! Batch runner: process every person in a roster and write per-person
//! sequence artifacts for the report compiler.
//!
//! Stdout carries only the `PROGRESS:` protocol lines for external
//! monitors; all logging goes to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use dossier::config;
use dossier::pipeline::batch::{run_batch, BatchConfig, BatchSummary, DEFAULT_MAX_CONCURRENT};
use dossier::pipeline::organize::sanitize_component;
use dossier::pipeline::{ExifTool, PipelineError};
use dossier::progress::{NullSink, ProgressReporter, ProgressSink, StdoutSink};

#[derive(Parser, Debug)]
#[command(name = "dossier-batch", version, about = "Reconcile and organize every person in a roster")]
struct Args {
    /// Roster file, one person folder name per line.
    #[arg(long)]
    roster: PathBuf,

    /// Category list file, one category folder name per line.
    #[arg(long)]
    categories: PathBuf,

    /// Library root containing one folder per person.
    #[arg(long, default_value_os_t = config::library_root())]
    root: PathBuf,

    /// Maximum number of people processed concurrently.
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT)]
    jobs: usize,

    /// Suppress the PROGRESS protocol on stdout.
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dossier::init_tracing();
    let args = Args::parse();

    let sink: Box<dyn ProgressSink> = if args.quiet {
        Box::new(NullSink)
    } else {
        Box::new(StdoutSink)
    };
    let progress = Arc::new(ProgressReporter::new(sink));

    match run(args, progress.clone()).await {
        Ok(summary) if summary.all_failed() => {
            progress.fail();
            ExitCode::FAILURE
        }
        Ok(_) => {
            progress.finish();
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Batch aborted");
            progress.fail();
            ExitCode::FAILURE
        }
    }
}

async fn run(
    args: Args,
    progress: Arc<ProgressReporter>,
) -> Result<BatchSummary, PipelineError> {
    ExifTool::ensure_available().await?;

    let roster = config::load_roster(&args.roster)?;
    let categories = config::load_categories(&args.categories)?;

    progress.start();

    let summary = run_batch(
        Arc::new(ExifTool),
        roster,
        BatchConfig {
            root: args.root.clone(),
            categories,
            max_concurrent: args.jobs,
        },
        progress.clone(),
    )
    .await;

    progress.before_compile();
    write_sequences(&args.root, &summary).await?;

    for (person, reason) in &summary.failed {
        tracing::warn!(person, reason, "Person not processed");
    }
    tracing::info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "Batch summary"
    );

    Ok(summary)
}

/// One JSON sequence file per successful person, under `<root>/final/`.
async fn write_sequences(root: &std::path::Path, summary: &BatchSummary) -> Result<(), PipelineError> {
    if summary.succeeded.is_empty() {
        return Ok(());
    }

    let out_dir = root.join("final");
    tokio::fs::create_dir_all(&out_dir)
        .await
        .map_err(|e| PipelineError::Io {
            path: out_dir.clone(),
            source: e,
        })?;

    for outcome in &summary.succeeded {
        let file = out_dir.join(format!(
            "{}_sequence.json",
            sanitize_component(&outcome.person)
        ));
        let json = serde_json::to_vec_pretty(&outcome.sequence)
            .map_err(|e| PipelineError::MalformedOutput(e.to_string()))?;
        tokio::fs::write(&file, json)
            .await
            .map_err(|e| PipelineError::Io {
                path: file.clone(),
                source: e,
            })?;
        tracing::debug!(person = outcome.person, path = %file.display(), "Sequence written");
    }

    Ok(())
}
