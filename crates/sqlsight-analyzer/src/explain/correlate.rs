//! Plan Correlation
//!
//! Walks EXPLAIN rows in order, resolves each row's `table` cell through the
//! [`AliasMap`] (falling back to the schema-less table name) and looks up the resolved table's column usage so every finding can
//! name concrete index candidates. Findings become table-scoped [`TableWarning`]s,
//! a highlight level per table and a human-readable narrative.
//!
//! Rows whose table cannot be resolved still contribute narrative lines but never
//! produce a warning or a highlight.

use std::collections::HashSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::ExplainRow;
use crate::config::AnalyzerConfig;
use crate::usage::{AliasMap, TableUsage, TableUsages};

/// Row estimates above this are mentioned even when below the warning threshold
pub const INFORMATIONAL_ROW_ESTIMATE: u64 = 10_000;

pub const NARRATIVE_HEADER: &str = "--- EXPLAIN Plan Micro-Analysis ---";

/// Kind of issue found in an EXPLAIN row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningType {
    /// Access type `ALL`: every row of the table is read
    FullTableScan,
    /// Candidate indexes exist, or were expected, but none was chosen
    IndexNotUsed,
    /// Estimated rows above the configured threshold
    HighRowEstimate,
    /// `Using filesort` in Extra
    FilesortUsed,
    /// `Using temporary` in Extra
    TemporaryTableUsed,
}

impl WarningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTableScan => "Full Table Scan",
            Self::IndexNotUsed => "Index Not Used",
            Self::HighRowEstimate => "High Row Estimate",
            Self::FilesortUsed => "Filesort Used",
            Self::TemporaryTableUsed => "Temporary Table Used",
        }
    }

    /// Highlight applied to the table's report
    pub fn highlight(&self) -> HighlightLevel {
        match self {
            Self::FullTableScan => HighlightLevel::Critical,
            _ => HighlightLevel::Caution,
        }
    }
}

impl fmt::Display for WarningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finding attached to one resolved table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableWarning {
    /// Canonical table name
    pub table: String,
    pub warning_type: WarningType,
    pub message: String,
    /// Columns worth indexing for this finding (WHERE, ORDER BY or GROUP BY columns)
    pub index_candidates: Vec<String>,
}

/// Visual emphasis for a table's report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightLevel {
    /// Worth a look
    Caution,
    /// Needs attention; never downgraded to caution
    Critical,
}

/// Everything derived from one set of EXPLAIN rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub warnings: Vec<TableWarning>,
    pub narrative: String,
    /// Canonical table name -> strongest highlight raised for it
    pub highlights: IndexMap<String, HighlightLevel>,
}

impl Correlation {
    pub fn highlight_for(&self, table: &str) -> Option<HighlightLevel> {
        self.highlights
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, level)| *level)
    }

    /// Warnings for one table, in discovery order
    pub fn warnings_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a TableWarning> {
        self.warnings
            .iter()
            .filter(move |warning| warning.table.eq_ignore_ascii_case(table))
    }

    fn push(&mut self, warning: TableWarning) {
        let level = warning.warning_type.highlight();
        let current = self.highlights.entry(warning.table.clone()).or_insert(level);
        // Critical is never downgraded
        *current = (*current).max(level);
        self.warnings.push(warning);
    }
}

/// Correlates EXPLAIN rows with the structural analysis of the same statement
///
/// Estimates above `row_threshold` raise a [`WarningType::HighRowEstimate`]; smaller
/// estimates above [`INFORMATIONAL_ROW_ESTIMATE`] are only narrated.
pub fn correlate(
    rows: &[ExplainRow],
    aliases: &AliasMap,
    usages: &TableUsages,
    row_threshold: u64,
) -> Correlation {
    correlate_rows(rows, aliases, usages, row_threshold, INFORMATIONAL_ROW_ESTIMATE)
}

/// [`correlate`] with both row thresholds taken from the analyzer configuration
pub fn correlate_with(
    rows: &[ExplainRow],
    aliases: &AliasMap,
    usages: &TableUsages,
    config: &AnalyzerConfig,
) -> Correlation {
    correlate_rows(
        rows,
        aliases,
        usages,
        config.row_threshold,
        config.informational_row_threshold,
    )
}

fn correlate_rows(
    rows: &[ExplainRow],
    aliases: &AliasMap,
    usages: &TableUsages,
    row_threshold: u64,
    informational_threshold: u64,
) -> Correlation {
    let mut correlation = Correlation::default();
    let mut narrative = format!("{NARRATIVE_HEADER}\n");

    if rows.is_empty() {
        narrative.push_str("No EXPLAIN plan data available to analyze.\n");
        correlation.narrative = narrative;
        return correlation;
    }

    let empty = TableUsage::default();
    let mut findings = 0usize;

    for (index, row) in rows.iter().enumerate() {
        let row_id = row.row_id(index);
        let alias = row.table();
        let table = alias
            .as_deref()
            .and_then(|alias| aliases.resolve_reported(alias))
            .map(str::to_string);
        let usage = table
            .as_deref()
            .and_then(|table| usages.get_known(table))
            .unwrap_or(&empty);

        let label = format!(
            "[{row_id} {}{}]",
            alias.as_deref().unwrap_or("?"),
            table
                .as_deref()
                .map(|table| format!(" ({table})"))
                .unwrap_or_default()
        );

        let mut raise = |warning_type: WarningType, message: String, candidates: &IndexSet<String>| {
            if let Some(table) = &table {
                correlation.push(TableWarning {
                    table: table.clone(),
                    warning_type,
                    message,
                    index_candidates: candidates.iter().cloned().collect(),
                });
            }
        };

        if row
            .access_type()
            .is_some_and(|access| access.eq_ignore_ascii_case("ALL"))
        {
            let mut suggestion = String::from("Suggestion: Index JOIN/WHERE columns.");
            if !usage.where_columns.is_empty() {
                suggestion.push_str(&format!(" Candidates: {}", bracketed(&usage.where_columns)));
            } else if table.is_some() {
                suggestion.push_str(&format!(
                    " Check JOIN columns for '{}'.",
                    alias.as_deref().unwrap_or("?")
                ));
            }
            narrative.push_str(&format!(
                "{label} SEVERE: Full Table Scan ('type' is 'ALL'). Why: DB read every row.\n  > {suggestion}\n"
            ));
            raise(WarningType::FullTableScan, suggestion, &usage.where_columns);
            findings += 1;
        }

        if let Some(possible_keys) = row.possible_keys()
            && row.key().is_none()
        {
            let explanation = unused_index_reasons(usage);
            narrative.push_str(&format!(
                "{label} WARN: Index Not Used\n  > Possible keys [{possible_keys}] found, but none used.\n  > {explanation}"
            ));
            raise(
                WarningType::IndexNotUsed,
                explanation.replace("\n    - ", "\n- ").trim().to_string(),
                &usage.where_columns,
            );
            findings += 1;
        }

        let estimate = row.row_estimate();
        if estimate > row_threshold {
            narrative.push_str(&format!(
                "{label} INFO: High est. rows ({estimate}).\n  > SUGGEST: Check WHERE/JOIN selectivity.\n"
            ));
            raise(
                WarningType::HighRowEstimate,
                format!("Est. rows: {estimate}"),
                &usage.where_columns,
            );
            findings += 1;
        } else if estimate > informational_threshold {
            narrative.push_str(&format!("{label} INFO: Est. rows: {estimate}\n"));
            findings += 1;
        }

        let extra = row.extra().unwrap_or_default();
        if extra.contains("Using filesort") {
            let mut suggestion = String::from("Suggest: Index ORDER BY cols.");
            if !usage.order_by_columns.is_empty() {
                suggestion.push_str(&format!(
                    " Candidates: {}",
                    bracketed(&usage.order_by_columns)
                ));
            }
            narrative.push_str(&format!("{label} WARN: 'Using filesort'.\n  > {suggestion}\n"));
            raise(WarningType::FilesortUsed, suggestion, &usage.order_by_columns);
            findings += 1;
        }

        if extra.contains("Using temporary") {
            let mut suggestion = String::from(
                "Suggest: Temp table needed (slow). Common for complex GROUP BY/DISTINCT/UNION.",
            );
            if usage.group_by_columns.is_empty() {
                suggestion.push_str(" Simplify query?");
            } else {
                suggestion.push_str(&format!(
                    " Consider indexing GROUP BY cols: {}",
                    bracketed(&usage.group_by_columns)
                ));
            }
            narrative.push_str(&format!("{label} WARN: 'Using temporary'.\n  > {suggestion}\n"));
            raise(
                WarningType::TemporaryTableUsed,
                suggestion,
                &usage.group_by_columns,
            );
            findings += 1;
        }
    }

    if findings == 0 {
        narrative.push_str("EXPLAIN plan analysis found no common high-priority issues.\n");
    }

    tracing::debug!(
        rows = rows.len(),
        warnings = correlation.warnings.len(),
        "correlated EXPLAIN rows"
    );
    correlation.narrative = narrative;
    correlation
}

/// Reasons an available index may have been skipped, one `    - ` line each
fn unused_index_reasons(usage: &TableUsage) -> String {
    let mut explanation = String::from("Potential reasons:\n");
    let functions = &usage.function_where_columns;

    let wrapped: IndexSet<String> = usage
        .where_columns
        .iter()
        .filter(|column| usage.function_where_contains(column))
        .cloned()
        .collect();
    let reason_found = !wrapped.is_empty();
    if reason_found {
        explanation.push_str(&format!("    - Func on indexed col(s): {}\n", bracketed(&wrapped)));
    }

    explanation.push_str("    - Data type mismatch in JOIN/WHERE");
    if !usage.where_columns.is_empty() {
        explanation.push_str(&format!(": {}", bracketed(&usage.where_columns)));
    }
    explanation.push('\n');
    explanation
        .push_str("    - Optimizer chose scan (small table / low selectivity / outdated stats)\n");

    if !reason_found && !functions.is_empty() {
        explanation.push_str(&format!(
            "    - Note: Funcs in WHERE on: {}. Overlap with keys?\n",
            bracketed(functions)
        ));
    }
    explanation
}

fn bracketed(columns: &IndexSet<String>) -> String {
    format!(
        "[{}]",
        columns.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    )
}

/// Suppresses repeated table warnings across runs of one session
///
/// A warning is admitted once per `(table, warning type)` pair; table names
/// compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct WarningLedger {
    seen: HashSet<(String, WarningType)>,
}

impl WarningLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the warnings not admitted before, recording them
    pub fn admit(&mut self, warnings: Vec<TableWarning>) -> Vec<TableWarning> {
        warnings
            .into_iter()
            .filter(|warning| {
                self.seen
                    .insert((warning.table.to_lowercase(), warning.warning_type))
            })
            .collect()
    }

    pub fn contains(&self, table: &str, warning_type: WarningType) -> bool {
        self.seen.contains(&(table.to_lowercase(), warning_type))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forgets every admitted warning, as when a new session starts
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
