use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::backend::engine::AnalysisConfig;

use super::FrontendError;


#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotSource {
    File(PathBuf),
    // Synthetic mesh, random unless seeded.
    Demo { device_count: usize, seed: Option<u64> },
}


#[derive(Clone, Debug)]
pub struct GeneralConfig {
    analysis: AnalysisConfig,
    source: SnapshotSource,
    output_directory: Option<PathBuf>,
}

impl GeneralConfig {
    #[must_use]
    pub fn new(
        analysis: AnalysisConfig,
        source: SnapshotSource,
        output_directory: Option<PathBuf>,
    ) -> Self {
        Self { analysis, source, output_directory }
    }

    #[must_use]
    pub fn analysis_config(&self) -> &AnalysisConfig {
        &self.analysis
    }

    #[must_use]
    pub fn source(&self) -> &SnapshotSource {
        &self.source
    }

    // If `None`, the report goes to stdout.
    #[must_use]
    pub fn output_directory(&self) -> Option<&Path> {
        self.output_directory.as_deref()
    }
}


/// Reads an analysis configuration. Fields missing from the file keep their
/// defaults, and no file at all means the default configuration.
///
/// # Errors
///
/// Will return `Err` if the file can not be read or is not valid JSON.
/// Semantic checks happen when the engine is built.
pub fn load_analysis_config(path: Option<&Path>) -> Result<AnalysisConfig, FrontendError> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };

    let json = fs::read_to_string(path)
        .map_err(|error| FrontendError::Io(path.to_path_buf(), error))?;
    let config = serde_json::from_str(&json)?;

    info!("Loaded analysis configuration from {}", path.display());

    Ok(config)
}
