use std::path::PathBuf;

use thiserror::Error;

use crate::backend::engine::ConfigurationError;
use crate::backend::snapshot::SnapshotError;


pub mod cli;
pub mod config;
pub mod demo;
pub mod output;


#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("Failed to access `{0}` with error `{1}`")]
    Io(PathBuf, std::io::Error),
    #[error("Failed to handle JSON with error `{0}`")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
