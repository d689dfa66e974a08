use std::path::{Path, PathBuf};

use brel_core::{FetchError, ReconcileError, SchemaError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetching upstream releases failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Reconcile(#[from] ReconcileError),

    #[error("{}: {kind}: {message}", path.display())]
    Io {
        path: PathBuf,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("Background task failed: {0}")]
    Join(String),
}

impl PipelineError {
    pub fn io(path: &Path, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Failed to read settings from {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("Settings file {} is invalid: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}
