//! Captured EXPLAIN Runner
//!
//! Serves EXPLAIN rows saved from a database client instead of querying a live
//! connection. A capture holding a database error message (`ERROR 1054 (42S22): ...`)
//! replays that error, so remediation advice can be checked offline.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlsight_analyzer::{DbError, ExplainRow, ExplainRunner, parse_explain_output};

pub struct FileExplainRunner {
    path: PathBuf,
}

impl FileExplainRunner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ExplainRunner for FileExplainRunner {
    async fn connect(&self) -> Result<(), DbError> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            Ok(())
        } else {
            Err(DbError::classify(format!(
                "EXPLAIN capture not found: {}",
                self.path.display()
            )))
        }
    }

    async fn run_explain(&self, sql: &str) -> Result<Vec<ExplainRow>, DbError> {
        tracing::debug!(path = %self.path.display(), sql, "replaying captured EXPLAIN");
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| DbError::classify(format!("{}: {e}", self.path.display())))?;
        rows_from_capture(&text)
    }
}

/// Parses a capture, replaying a recorded database error as a [`DbError`]
pub fn rows_from_capture(text: &str) -> Result<Vec<ExplainRow>, DbError> {
    let trimmed = text.trim();
    if trimmed.starts_with("ERROR") {
        return Err(DbError::classify(trimmed));
    }
    parse_explain_output(trimmed).map_err(|e| DbError::classify(e.to_string()))
}
