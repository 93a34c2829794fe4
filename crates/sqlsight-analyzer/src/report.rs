//! Report Data
//!
//! Plain-text and tabular renderings of the analysis for display front-ends. The
//! table report of each table is a list of `Category | Item | Notes` rows; EXPLAIN
//! warnings are pushed on top of it as they arrive.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::analysis::StructuralAnalysis;
use crate::explain::{TableWarning, WarningType};
use crate::usage::{TableKey, TableUsage, TableUsages, simple_name};

pub const WARNING_CATEGORY: &str = "--- WARNING ---";

/// Renders the structural analysis as text
pub fn render_structural(analysis: &StructuralAnalysis) -> String {
    if !analysis.is_valid {
        return format!(
            "--- SQL Parse Error ---\n{}",
            analysis.error.as_deref().unwrap_or_default()
        );
    }

    let mut out = String::from("--- Query Structure Analysis ---\n");
    out.push_str(&format!("Statement Type: {}\n", analysis.statement_type));

    out.push_str("\n--- Query Statistics ---\n");
    if analysis.statistics.is_empty() {
        out.push_str("(No specific stats gathered)\n");
    } else {
        for (key, value) in analysis.statistics.iter() {
            out.push_str(&format!("{key}: {value}\n"));
        }
    }

    if !analysis.hints.is_empty() {
        out.push_str("\n--- Performance Hints (Structural) ---\n");
        for hint in &analysis.hints {
            out.push_str(&format!("{hint}\n\n"));
        }
    }
    out
}

/// One `Category | Item | Notes` row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub category: String,
    pub item: String,
    pub notes: String,
}

impl ReportRow {
    pub fn new(
        category: impl Into<String>,
        item: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            item: item.into(),
            notes: notes.into(),
        }
    }

    fn spacer() -> Self {
        Self::default()
    }
}

/// The per-table report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows: Vec<ReportRow>,
}

impl TableReport {
    pub fn from_usage(key: &TableKey, usage: &TableUsage) -> Self {
        let mut rows = vec![
            ReportRow::new(
                "General",
                "Alias Used",
                usage.alias_used.as_deref().unwrap_or("N/A"),
            ),
            ReportRow::spacer(),
        ];

        if !usage.function_where_columns.is_empty() {
            rows.push(ReportRow::new(
                WARNING_CATEGORY,
                "Function on WHERE column(s)",
                "May prevent index usage",
            ));
            for column in &usage.function_where_columns {
                rows.push(ReportRow::new("", format!("- {column}"), "(Function applied)"));
            }
            rows.push(ReportRow::spacer());
        }

        rows.push(ReportRow::new(
            "--- ALL COLUMNS USED ---",
            format!("({} found)", usage.all_columns.len()),
            "",
        ));
        if usage.all_columns.is_empty() {
            rows.push(ReportRow::new("", "(None Detected)", ""));
        } else {
            rows.extend(
                usage
                    .all_columns
                    .iter()
                    .map(|column| ReportRow::new("Column", column.as_str(), "")),
            );
        }
        rows.push(ReportRow::spacer());

        rows.push(ReportRow::new(
            "--- WHERE/JOIN COLUMNS ---",
            format!("({} found)", usage.where_columns.len()),
            "",
        ));
        if usage.where_columns.is_empty() {
            rows.push(ReportRow::new("", "(None)", ""));
        } else {
            for column in &usage.where_columns {
                let notes = if usage.function_where_contains(column) {
                    "(Function applied)"
                } else {
                    ""
                };
                rows.push(ReportRow::new("Filtering", column.as_str(), notes));
            }
        }

        Self {
            table: key.to_string(),
            rows,
        }
    }

    /// Whether the report's top block already describes this warning type
    pub fn is_headed_by(&self, warning_type: WarningType) -> bool {
        self.rows.first().is_some_and(|row| {
            row.category == WARNING_CATEGORY && row.item == warning_type.as_str()
        })
    }

    /// Puts a warning block on top of the report
    ///
    /// Returns false when the same warning type already heads the report.
    pub fn apply_warning(&mut self, warning: &TableWarning) -> bool {
        if self.is_headed_by(warning.warning_type) {
            tracing::debug!(
                table = %self.table,
                warning = %warning.warning_type,
                "warning already heads table report"
            );
            return false;
        }

        let headline = warning.message.lines().next().unwrap_or_default();
        let mut block = vec![
            ReportRow::new(WARNING_CATEGORY, warning.warning_type.as_str(), headline),
            ReportRow::spacer(),
        ];
        let suggestions = suggestion_rows(warning);
        let has_suggestions = !suggestions.is_empty();
        block.extend(suggestions);
        if has_suggestions {
            block.push(ReportRow::spacer());
        }

        self.rows.splice(0..0, block);
        true
    }
}

fn suggestion_rows(warning: &TableWarning) -> Vec<ReportRow> {
    let candidates = if warning.index_candidates.is_empty() {
        None
    } else {
        Some(format!("[{}]", warning.index_candidates.join(", ")))
    };

    match warning.warning_type {
        WarningType::FullTableScan => vec![match candidates {
            Some(columns) => {
                ReportRow::new("-> Index Suggestion", "Index JOIN/WHERE columns:", columns)
            }
            None => ReportRow::new(
                "-> Index Suggestion",
                "Index JOIN columns:",
                "(Check query for columns used to join)",
            ),
        }],
        WarningType::IndexNotUsed => {
            let mut lines = warning.message.lines();
            let mut rows = vec![ReportRow::new(
                "-> Explanation",
                lines.next().unwrap_or_default(),
                "",
            )];
            rows.extend(lines.map(|line| ReportRow::new("", line.trim(), "")));
            rows
        }
        WarningType::FilesortUsed => vec![ReportRow::new(
            "-> Index Suggestion",
            "Index ORDER BY columns:",
            candidates.unwrap_or_else(|| "(Columns not identified)".to_string()),
        )],
        WarningType::TemporaryTableUsed => vec![match candidates {
            Some(columns) => {
                ReportRow::new("-> Index Suggestion", "Index GROUP BY columns:", columns)
            }
            None => ReportRow::new(
                "-> Index Suggestion",
                "Consider indexing GROUP BY columns",
                "(If applicable)",
            ),
        }],
        WarningType::HighRowEstimate => vec![ReportRow::new(
            "-> Info",
            warning.message.as_str(),
            "(Check WHERE/JOIN selectivity)",
        )],
    }
}

/// Table reports for every usage record, in record order
pub fn table_reports(usages: &TableUsages) -> Vec<TableReport> {
    usages
        .iter()
        .map(|(key, usage)| TableReport::from_usage(key, usage))
        .collect()
}

/// Applies warnings to the matching reports, ignoring a schema prefix on the table name
///
/// Returns the tables whose report received at least one warning.
pub fn apply_warnings(
    reports: &mut [TableReport],
    warnings: &[TableWarning],
) -> IndexSet<String> {
    let mut touched = IndexSet::new();
    for warning in warnings {
        let simple = simple_name(&warning.table);
        let Some(report) = reports
            .iter_mut()
            .find(|report| simple_name(&report.table).eq_ignore_ascii_case(simple))
        else {
            tracing::warn!(table = %warning.table, "no table report for warning");
            continue;
        };
        if report.apply_warning(warning) {
            touched.insert(report.table.clone());
        }
    }
    touched
}

#[cfg(test)]
mod tests;
