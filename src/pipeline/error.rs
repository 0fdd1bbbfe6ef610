//! Pipeline error taxonomy.
//!
//! Per-document failures (tool, copy, stamp) are recovered where they occur;
//! only configuration and missing-tool conditions abort a run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Metadata tool error: {0}")]
    Tool(String),

    #[error("Required external tool not found on PATH: {0}")]
    ToolMissing(String),

    #[error("Malformed tool output: {0}")]
    MalformedOutput(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Person folder missing: {0}")]
    PersonFolderMissing(PathBuf),

    #[error("Document {path} is missing its {field}")]
    Incomplete { path: PathBuf, field: &'static str },

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
