//! Analyzer configuration
//!
//! Thresholds the hint engine and the EXPLAIN correlator compare against. Values
//! are read from TOML; missing keys keep their defaults.
//!
//! ```toml
//! row_threshold = 50000
//! large_values_threshold = 100
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// EXPLAIN row estimate above which a HighRowEstimate warning is raised
    pub row_threshold: u64,
    /// EXPLAIN row estimate above which the narrative notes the estimate
    pub informational_row_threshold: u64,
    /// VALUES row count above which an INSERT is reported as a large list
    pub large_values_threshold: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            row_threshold: 10_000,
            informational_row_threshold: 10_000,
            large_values_threshold: 50,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_row_threshold(mut self, threshold: u64) -> Self {
        self.row_threshold = threshold;
        self
    }

    pub fn with_informational_row_threshold(mut self, threshold: u64) -> Self {
        self.informational_row_threshold = threshold;
        self
    }

    pub fn with_large_values_threshold(mut self, threshold: usize) -> Self {
        self.large_values_threshold = threshold;
        self
    }

    /// Parses a TOML document and validates the result
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded analyzer config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_threshold == 0 {
            return Err(ConfigError::InvalidValue(
                "row_threshold must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
