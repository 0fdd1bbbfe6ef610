//! dossier — catalogs per-person PDF collections, enriches each document with
//! metadata read by an external tool, assigns stable ordering counters, and
//! reconciles on-disk filenames so a downstream compiler can assemble one
//! report per person.

pub mod config;
pub mod counting;
pub mod models;
pub mod pipeline;
pub mod progress;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the CLI binaries.
///
/// Logs go to stderr: stdout is reserved for the `PROGRESS:` protocol
/// consumed by external monitors.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}
