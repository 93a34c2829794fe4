//! Shared fixtures for the integration tests

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use sqlsight_analyzer::{DbError, ExplainRow, ExplainRunner};

/// Serves fixed EXPLAIN rows and records every statement it was asked to run
pub struct MockRunner {
    rows: Vec<ExplainRow>,
    failure: Option<String>,
    pub executed: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn with_rows(rows: Vec<ExplainRow>) -> Self {
        Self {
            rows,
            failure: None,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            rows: Vec::new(),
            failure: Some(message.to_string()),
            executed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ExplainRunner for MockRunner {
    async fn run_explain(&self, sql: &str) -> Result<Vec<ExplainRow>, DbError> {
        self.executed
            .lock()
            .map_err(|e| DbError::classify(e.to_string()))?
            .push(sql.to_string());
        match &self.failure {
            Some(message) => Err(DbError::classify(message.as_str())),
            None => Ok(self.rows.clone()),
        }
    }
}

/// A MySQL EXPLAIN row with the usual columns
pub fn explain_row(table: &str, access: &str, rows: u64, extra: &str) -> ExplainRow {
    ExplainRow::new()
        .with("id", 1)
        .with("select_type", "SIMPLE")
        .with("table", table)
        .with("type", access)
        .with("possible_keys", Value::Null)
        .with("key", Value::Null)
        .with("rows", rows)
        .with("Extra", extra)
}
