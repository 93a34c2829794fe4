//! EXPLAIN Rows

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of EXPLAIN output, keyed by column label
///
/// Column lookups ignore case: MySQL reports `Extra` while other clients lower-case
/// every label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExplainRow {
    columns: IndexMap<String, Value>,
}

impl ExplainRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<Value>) {
        self.columns.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column).or_else(|| {
            self.columns
                .iter()
                .find(|(label, _)| label.eq_ignore_ascii_case(column))
                .map(|(_, value)| value)
        })
    }

    /// The cell rendered as text; SQL NULL and missing columns are `None`
    pub fn text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// The `table` cell, which carries the alias when the query used one
    pub fn table(&self) -> Option<String> {
        self.text("table")
    }

    pub fn access_type(&self) -> Option<String> {
        self.text("type")
    }

    pub fn possible_keys(&self) -> Option<String> {
        present(self.text("possible_keys"))
    }

    pub fn key(&self) -> Option<String> {
        present(self.text("key"))
    }

    pub fn extra(&self) -> Option<String> {
        self.text("Extra")
    }

    /// Estimated rows; decimal estimates are truncated and unparseable cells count as zero
    pub fn row_estimate(&self) -> u64 {
        let Some(value) = self.get("rows") else {
            return 0;
        };
        match value {
            Value::Number(number) => number
                .as_u64()
                .or_else(|| number.as_f64().map(|f| f.max(0.0) as u64))
                .unwrap_or(0),
            Value::String(text) => parse_estimate(text),
            _ => 0,
        }
    }

    /// Identifier used in narratives: the `id` cell (or the first cell), `Row <n>` when empty
    pub fn row_id(&self, index: usize) -> String {
        self.get("id")
            .or_else(|| self.columns.values().next())
            .and_then(|value| match value {
                Value::Null => None,
                Value::String(text) if text.trim().is_empty() => None,
                Value::String(text) => Some(text.trim().to_string()),
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| format!("Row {}", index + 1))
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(label, value)| (label.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Blank cells and the literal `NULL` some clients print mean "no value"
fn present(text: Option<String>) -> Option<String> {
    text.filter(|value| {
        let value = value.trim();
        !value.is_empty() && !value.eq_ignore_ascii_case("null")
    })
}

fn parse_estimate(text: &str) -> u64 {
    let text = text.trim();
    if text.contains('.') {
        text.parse::<f64>()
            .map(|f| f.max(0.0) as u64)
            .unwrap_or(0)
    } else {
        text.parse::<u64>().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests;
