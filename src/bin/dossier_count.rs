//! Category-count tool: tag each production PDF with its mapped categories
//! and emit the statistics CSV.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use dossier::config;
use dossier::counting::{collect_counts, write_csv};
use dossier::pipeline::{ExifTool, PipelineError};

#[derive(Parser, Debug)]
#[command(name = "dossier-count", version, about = "Count category matches across production PDFs")]
struct Args {
    /// Roster file, one person folder name per line.
    #[arg(long)]
    roster: PathBuf,

    /// Alias map file, one `<category>,<alias>` pair per line.
    #[arg(long)]
    aliases: PathBuf,

    /// Library root containing one folder per person.
    #[arg(long, default_value_os_t = config::library_root())]
    root: PathBuf,

    /// Category folder scanned for each person.
    #[arg(long, default_value = "Production")]
    production_category: String,

    /// CSV output path; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dossier::init_tracing();
    let args = Args::parse();

    match run(args).await {
        Ok(rows) => {
            tracing::info!(rows, "Count complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Count failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<usize, PipelineError> {
    ExifTool::ensure_available().await?;

    let roster = config::load_roster(&args.roster)?;
    let aliases = config::load_alias_map(&args.aliases)?;

    let rows = collect_counts(
        &ExifTool,
        &args.root,
        &roster,
        &args.production_category,
        &aliases,
    )
    .await?;

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|e| PipelineError::Io {
                path: path.clone(),
                source: e,
            })?;
            write_csv(&rows, file)?;
            tracing::info!(path = %path.display(), "CSV written");
        }
        None => write_csv(&rows, std::io::stdout().lock())?,
    }

    Ok(rows.len())
}
