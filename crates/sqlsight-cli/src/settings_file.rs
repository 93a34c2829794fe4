//! Settings file utilities

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sqlsight_analyzer::AnalyzerConfig;

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("sqlsight"))
}

pub fn config_file() -> Result<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Loads the analyzer configuration
///
/// An explicit path must exist. Without one, the user config file is read when
/// present and the defaults apply otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<AnalyzerConfig> {
    if let Some(path) = explicit {
        return AnalyzerConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()));
    }

    let path = match config_file() {
        Ok(path) => path,
        Err(err) => {
            tracing::debug!(error = %err, "no config directory, using defaults");
            return Ok(AnalyzerConfig::default());
        }
    };
    if !path.exists() {
        return Ok(AnalyzerConfig::default());
    }
    AnalyzerConfig::load(&path).with_context(|| format!("Failed to load config: {}", path.display()))
}
