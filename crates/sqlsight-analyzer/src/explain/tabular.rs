//! Captured EXPLAIN Output
//!
//! Turns EXPLAIN output saved from a client into [`ExplainRow`]s. Three shapes are
//! accepted:
//!
//! - a JSON array of row objects (or a single object), as drivers return result sets
//! - tab-separated text, with or without a header line (`mysql -B`)
//! - pipe-separated box tables as printed by the interactive `mysql` client
//!
//! Header-less MySQL rows are mapped positionally, with and without the
//! `partitions` column.
//!
//! # Example
//!
//! ```
//! use sqlsight_analyzer::explain::parse_explain_output;
//!
//! let rows = parse_explain_output("1\tSIMPLE\to\tALL\tNULL\tNULL\tNULL\tNULL\t50000\t100.00\tUsing where")
//!     .unwrap();
//! assert_eq!(rows[0].access_type().as_deref(), Some("ALL"));
//! assert_eq!(rows[0].row_estimate(), 50000);
//! ```

use serde_json::Value;
use thiserror::Error;

use super::ExplainRow;

/// Errors that can occur when parsing captured EXPLAIN output
#[derive(Debug, Error)]
pub enum ExplainParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid EXPLAIN structure: {0}")]
    InvalidStructure(String),

    #[error("Empty EXPLAIN output")]
    EmptyOutput,
}

pub type Result<T> = std::result::Result<T, ExplainParseError>;

/// MySQL columns without `partitions` (11 columns)
const MYSQL_COLUMNS: &[&str] = &[
    "id",
    "select_type",
    "table",
    "type",
    "possible_keys",
    "key",
    "key_len",
    "ref",
    "rows",
    "filtered",
    "Extra",
];

/// MySQL columns with `partitions` (12 columns)
const MYSQL_PARTITIONED_COLUMNS: &[&str] = &[
    "id",
    "select_type",
    "table",
    "partitions",
    "type",
    "possible_keys",
    "key",
    "key_len",
    "ref",
    "rows",
    "filtered",
    "Extra",
];

/// Labels that identify a header line
const HEADER_LABELS: &[&str] = &[
    "id",
    "select_type",
    "table",
    "type",
    "possible_keys",
    "key",
    "rows",
    "extra",
];

/// Parses EXPLAIN output captured as JSON or client table text
pub fn parse_explain_output(text: &str) -> Result<Vec<ExplainRow>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExplainParseError::EmptyOutput);
    }

    let rows = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        parse_json_rows(trimmed)?
    } else {
        parse_tabular_rows(trimmed)?
    };
    tracing::debug!(rows = rows.len(), "parsed captured EXPLAIN output");
    Ok(rows)
}

fn parse_json_rows(text: &str) -> Result<Vec<ExplainRow>> {
    let json: Value = serde_json::from_str(text)?;
    let objects = match json {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => {
            return Err(ExplainParseError::InvalidStructure(
                "Expected an array of row objects".into(),
            ));
        }
    };

    if objects.is_empty() {
        return Err(ExplainParseError::EmptyOutput);
    }

    objects
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => {
                let mut row = ExplainRow::new();
                for (column, value) in map {
                    row.insert(&column, value);
                }
                Ok(row)
            }
            _ => Err(ExplainParseError::InvalidStructure(format!(
                "Row {} is not an object",
                index + 1
            ))),
        })
        .collect()
}

fn parse_tabular_rows(text: &str) -> Result<Vec<ExplainRow>> {
    let lines: Vec<Vec<&str>> = text
        .lines()
        .filter(|line| !line.trim().is_empty() && !is_border(line))
        .filter_map(split_cells)
        .collect();

    let Some(first) = lines.first() else {
        return Err(ExplainParseError::EmptyOutput);
    };

    let (header, data) = if is_header(first) {
        (Some(first.as_slice()), &lines[1..])
    } else {
        (None, &lines[..])
    };

    if data.is_empty() {
        return Err(ExplainParseError::EmptyOutput);
    }

    let rows: Vec<ExplainRow> = data
        .iter()
        .filter_map(|cells| match header {
            Some(labels) => Some(labeled_row(labels, cells)),
            None => positional_row(cells),
        })
        .collect();

    if rows.is_empty() {
        return Err(ExplainParseError::InvalidStructure(
            "No valid rows found".into(),
        ));
    }
    Ok(rows)
}

/// `+----+-------+` lines framing a box table
fn is_border(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('+') && line.chars().all(|c| matches!(c, '+' | '-' | '='))
}

/// Splits a line into trimmed cells; lines without separators (footers) are dropped
fn split_cells(line: &str) -> Option<Vec<&str>> {
    if line.contains('\t') {
        return Some(line.split('\t').map(str::trim).collect());
    }
    if !line.contains('|') {
        return None;
    }

    let mut cells: Vec<&str> = line.split('|').map(str::trim).collect();
    // Box edges leave an empty cell on each side
    if cells.first().is_some_and(|cell| cell.is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|cell| cell.is_empty()) {
        cells.pop();
    }
    Some(cells)
}

fn is_header(cells: &[&str]) -> bool {
    let labels = cells
        .iter()
        .filter(|cell| {
            HEADER_LABELS
                .iter()
                .any(|label| label.eq_ignore_ascii_case(cell))
        })
        .count();
    labels >= 2
}

fn labeled_row(labels: &[&str], cells: &[&str]) -> ExplainRow {
    let mut row = ExplainRow::new();
    for (index, label) in labels.iter().enumerate() {
        row.insert(label, cell_value(cells.get(index).copied().unwrap_or("NULL")));
    }
    row
}

fn positional_row(cells: &[&str]) -> Option<ExplainRow> {
    // Need at least id, select_type, table, type
    if cells.len() < 4 {
        return None;
    }

    // Position 3 is either the access type or `partitions`
    let has_partitions = cells.len() >= MYSQL_PARTITIONED_COLUMNS.len()
        || (cells.len() >= 5 && !is_access_type(cells[3]) && is_access_type(cells[4]));
    let labels = if has_partitions {
        MYSQL_PARTITIONED_COLUMNS
    } else {
        MYSQL_COLUMNS
    };

    let mut row = ExplainRow::new();
    for (label, cell) in labels.iter().zip(cells) {
        row.insert(label, cell_value(cell));
    }
    Some(row)
}

fn cell_value(cell: &str) -> Value {
    if cell.eq_ignore_ascii_case("null") {
        Value::Null
    } else {
        Value::String(cell.to_string())
    }
}

fn is_access_type(s: &str) -> bool {
    matches!(
        s.to_lowercase().as_str(),
        "all" | "index" | "range" | "ref" | "eq_ref" | "const" | "system" | "null" | "fulltext"
    )
}
