//! Structural Performance Hints
//!
//! Rule-based diagnostics computed from a statement's shape, its per-table column
//! usage and its statistics. Rules fire independently and hints are returned in
//! rule order, not sorted by severity; callers that want severity grouping sort
//! the list themselves.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;
use crate::stats::{QueryStatistics, keys};
use crate::syntax::{
    BinaryOp, DeleteStatement, Expr, InsertSource, InsertStatement, Node, SelectStatement,
    Statement, TraversalContext, UpdateStatement, Visitor, walk_expr,
};
use crate::usage::TableUsages;

/// Severity of a hint, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Severe => "SEVERE",
        }
    }

    pub fn is_severe(&self) -> bool {
        matches!(self, Self::Severe)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structural diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceHint {
    pub severity: Severity,
    pub title: String,
    /// Why the pattern is slow
    pub explanation: String,
    /// What to do about it
    pub suggestion: String,
}

impl PerformanceHint {
    pub fn new(
        severity: Severity,
        title: impl Into<String>,
        explanation: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            title: title.into(),
            explanation: explanation.into(),
            suggestion: suggestion.into(),
        }
    }
}

impl fmt::Display for PerformanceHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}\n  Why: {}\n  Suggestion: {}",
            self.severity, self.title, self.explanation, self.suggestion
        )
    }
}

/// The hint returned when the input held no statements
pub fn empty_query_hint() -> PerformanceHint {
    PerformanceHint::new(
        Severity::Info,
        "Empty Query",
        "The input string contained no SQL statements.",
        "Enter a valid SQL query.",
    )
}

/// Generates the hints for one statement
pub fn generate(
    statement: &Statement,
    usages: &TableUsages,
    stats: &QueryStatistics,
    config: &AnalyzerConfig,
) -> Vec<PerformanceHint> {
    let hints = match statement {
        Statement::Select(select) => select_hints(select, usages, stats),
        Statement::Insert(insert) => insert_hints(insert, config),
        Statement::Update(update) => update_hints(update, usages),
        Statement::Delete(delete) => delete_hints(delete, usages),
        Statement::Other(other) => vec![PerformanceHint::new(
            Severity::Info,
            "DDL/Custom Statement",
            format!("Statement type: {}", other.kind),
            "Structural analysis is basic for this type.",
        )],
    };

    let hints = if hints.is_empty() && !matches!(statement, Statement::Select(_)) {
        vec![PerformanceHint::new(
            Severity::Info,
            "Basic Analysis Complete",
            "No major structural issues detected for this statement type.",
            format!(
                "Review database-specific guidelines for {}.",
                statement.type_name()
            ),
        )]
    } else {
        hints
    };

    tracing::debug!(
        statement = statement.type_name(),
        hints = hints.len(),
        severe = hints.iter().filter(|h| h.severity.is_severe()).count(),
        "generated structural hints"
    );
    hints
}

fn select_hints(
    select: &SelectStatement,
    usages: &TableUsages,
    stats: &QueryStatistics,
) -> Vec<PerformanceHint> {
    let mut hints = Vec::new();

    if stats.flag(keys::USES_SELECT_STAR) {
        hints.push(PerformanceHint::new(
            Severity::Warn,
            "Avoid SELECT *",
            "Retrieving all columns (*) forces the database to fetch potentially unnecessary \
             data, increasing network traffic and memory usage. It also prevents certain index \
             optimizations (covering indexes).",
            "Explicitly list only the columns your application requires in the SELECT clause.",
        ));
    }

    for (table, usage) in usages.iter() {
        if usage.function_where_columns.is_empty() {
            continue;
        }
        hints.push(PerformanceHint::new(
            Severity::Severe,
            "Function on WHERE Column(s)",
            "Applying a function (like YEAR(), UPPER(), CONCAT()) to a column in the WHERE \
             clause often prevents the database from using an index on that column, forcing a \
             slower table scan. This is because the database must calculate the function's \
             result for every row before comparing.",
            format!(
                "Rewrite the condition to apply functions to the constant value instead of the \
                 column, if possible (e.g., `date_col >= '2024-01-01'` instead of \
                 `YEAR(date_col) = 2024`). Consider function-based indexes if rewriting isn't \
                 feasible (database-specific). Columns involved: [{}] in table '{}'.",
                join(&usage.function_where_columns),
                table
            ),
        ));
    }

    if !stats.flag(keys::HAS_WHERE_CLAUSE) {
        let table_count = stats.count(keys::TABLE_COUNT);
        if table_count > 1 {
            hints.push(PerformanceHint::new(
                Severity::Severe,
                "Potential Cartesian Product",
                format!(
                    "The query joins multiple tables ({table_count}) but lacks a WHERE clause to \
                     filter the results *after* joining. If JOIN conditions are missing or \
                     insufficient, this can result in a 'Cartesian Product' - every row from one \
                     table combined with every row from another, which is usually extremely \
                     large and slow."
                ),
                "Ensure correct and sufficient JOIN conditions (`ON tableA.col = tableB.col`) \
                 are specified for all joined tables. Add a WHERE clause if further filtering is \
                 needed.",
            ));
        } else if table_count == 1 {
            hints.push(PerformanceHint::new(
                Severity::Warn,
                "Potential Full Table Scan (No WHERE)",
                "The query selects from a single table without a WHERE clause. This forces the \
                 database to read every row (Full Table Scan), which can be slow for large \
                 tables.",
                "Add a WHERE clause to filter rows if you don't need the entire table's data. \
                 If the table is intentionally small, this might be acceptable.",
            ));
        }
    }

    for item in select.order_by.iter().filter(|item| !item.is_bare_column()) {
        hints.push(PerformanceHint::new(
            Severity::Warn,
            "Expression in ORDER BY",
            format!(
                "The ORDER BY clause uses an expression ('{}') instead of directly referencing a \
                 column. The database must calculate this expression for rows *before* sorting, \
                 preventing the use of standard indexes for sorting.",
                item.text
            ),
            "If possible, sort directly by indexed columns. Consider adding a function-based \
             index if sorting by the expression is essential (database-specific).",
        ));
    }

    for item in select.group_by.iter().filter(|item| !item.is_bare_column()) {
        hints.push(PerformanceHint::new(
            Severity::Info,
            "Expression in GROUP BY",
            format!(
                "The GROUP BY clause uses an expression ('{}'). While valid, grouping directly \
                 by columns might allow for better optimization or index usage in some \
                 databases.",
                item.text
            ),
            "Ensure grouping by the expression is necessary. Grouping by simple columns is \
             sometimes more efficient.",
        ));
    }

    if let Some(selection) = &select.selection {
        let wildcard_columns = leading_wildcard_columns(selection);
        if !wildcard_columns.is_empty() {
            hints.push(PerformanceHint::new(
                Severity::Warn,
                "LIKE with Leading Wildcard",
                format!(
                    "The WHERE clause uses `LIKE '%...'` (a leading wildcard) on column(s): [{}]. \
                     Standard B-tree indexes cannot be used efficiently for this type of search, \
                     often resulting in a full table/index scan.",
                    join(&wildcard_columns)
                ),
                "Avoid leading wildcards if possible. Consider full-text indexing if searching \
                 within text is a primary requirement. If trailing wildcards (`LIKE 'abc%'`) are \
                 sufficient, they can use standard indexes.",
            ));
        }

        if has_or_on_different_columns(selection) {
            hints.push(PerformanceHint::new(
                Severity::Info,
                "OR Condition on Different Columns",
                "The WHERE clause uses OR to combine conditions on different columns. Databases \
                 sometimes struggle to use multiple indexes efficiently for OR conditions, \
                 potentially leading to scans or less optimal index merges.",
                "Consider rewriting the query using UNION ALL if appropriate, especially if each \
                 part of the OR condition could use a separate index effectively. Evaluate the \
                 EXPLAIN plan carefully.",
            ));
        }
    }

    if stats.flag(keys::IS_DISTINCT) {
        hints.push(PerformanceHint::new(
            Severity::Info,
            "SELECT DISTINCT Usage",
            "The query uses SELECT DISTINCT to remove duplicate rows. This requires the database \
             to perform extra work (often sorting or hashing) on the result set, which can be \
             resource-intensive for large results.",
            "Ensure DISTINCT is truly necessary. Sometimes duplicates can be avoided by refining \
             JOIN conditions or using GROUP BY instead.",
        ));
    }

    if hints.is_empty() {
        hints.push(PerformanceHint::new(
            Severity::Info,
            "No Obvious Structural Issues",
            "The query structure doesn't show common beginner anti-patterns.",
            "Review the database-specific EXPLAIN plan for detailed execution analysis and index \
             usage.",
        ));
    }

    hints
}

fn insert_hints(insert: &InsertStatement, config: &AnalyzerConfig) -> Vec<PerformanceHint> {
    match &insert.source {
        InsertSource::Select(_) => vec![PerformanceHint::new(
            Severity::Info,
            "INSERT...SELECT",
            "Data is inserted based on a SELECT subquery.",
            "Analyze the SELECT subquery separately for potential performance issues. Ensure \
             target table indexes are maintained during insert.",
        )],
        InsertSource::Values { rows } if *rows > config.large_values_threshold => {
            vec![PerformanceHint::new(
                Severity::Info,
                "Large VALUES List",
                format!("INSERT uses many VALUES clauses ({rows})."),
                "For very large numbers of rows, consider database-specific bulk insert \
                 utilities or batching for better performance.",
            )]
        }
        _ => Vec::new(),
    }
}

fn update_hints(update: &UpdateStatement, usages: &TableUsages) -> Vec<PerformanceHint> {
    let table = &update.table.name;
    if update.selection.is_none() {
        return vec![PerformanceHint::new(
            Severity::Severe,
            "UPDATE Without WHERE",
            format!("This statement will update *all* rows in the table '{table}'."),
            "ALWAYS include a WHERE clause unless you explicitly intend to modify the entire \
             table. Double-check your logic.",
        )];
    }
    target_function_hints(table, usages)
}

fn delete_hints(delete: &DeleteStatement, usages: &TableUsages) -> Vec<PerformanceHint> {
    let table = &delete.table.name;
    if delete.selection.is_none() {
        return vec![PerformanceHint::new(
            Severity::Severe,
            "DELETE Without WHERE",
            format!("This statement will delete *all* rows from the table '{table}'."),
            "ALWAYS include a WHERE clause unless you explicitly intend to clear the entire \
             table (consider TRUNCATE if applicable and appropriate). Double-check your logic.",
        )];
    }
    target_function_hints(table, usages)
}

/// Function-on-WHERE check scoped to the DML target table
fn target_function_hints(table: &str, usages: &TableUsages) -> Vec<PerformanceHint> {
    let Some(usage) = usages.get_known(table) else {
        tracing::warn!(table, "no usage record for DML target");
        return Vec::new();
    };
    if usage.function_where_columns.is_empty() {
        return Vec::new();
    }
    vec![PerformanceHint::new(
        Severity::Warn,
        "Function on WHERE Column(s)",
        format!(
            "Applying a function to column(s) [{}] in the WHERE clause often prevents index usage.",
            join(&usage.function_where_columns)
        ),
        "Rewrite the condition to apply functions to constant values if possible, or consider \
         function-based indexes.",
    )]
}

fn join(columns: &IndexSet<String>) -> String {
    columns
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Strips one layer of matching single or double quotes
fn unquote(literal: &str) -> &str {
    let trimmed = literal.trim();
    let quoted = trimmed.len() >= 2
        && ((trimmed.starts_with('\'') && trimmed.ends_with('\''))
            || (trimmed.starts_with('"') && trimmed.ends_with('"')));
    if quoted {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Columns compared with `LIKE '%...'` anywhere in a WHERE tree
pub fn leading_wildcard_columns(selection: &Expr) -> IndexSet<String> {
    #[derive(Default)]
    struct LeadingWildcards {
        columns: IndexSet<String>,
    }

    impl Visitor for LeadingWildcards {
        fn enter(&mut self, node: Node<'_>, _ctx: &TraversalContext) {
            if let Node::Expression(Expr::Like { expr, pattern, .. }) = node
                && let (Expr::Column(column), Expr::Literal(literal)) = (&**expr, &**pattern)
                && unquote(literal).starts_with('%')
            {
                self.columns.insert(column.name.clone());
            }
        }
    }

    let mut finder = LeadingWildcards::default();
    walk_expr(selection, TraversalContext::default(), &mut finder);
    finder.columns
}

/// Whether an OR in the WHERE tree combines conditions on different base columns
///
/// ORs nested in function arguments or subqueries are not considered, and base
/// columns are collected without descending into either.
pub fn has_or_on_different_columns(selection: &Expr) -> bool {
    #[derive(Default)]
    struct OrFinder {
        found: bool,
    }

    impl Visitor for OrFinder {
        fn enter(&mut self, node: Node<'_>, ctx: &TraversalContext) {
            if self.found || ctx.in_function() || ctx.subquery_depth > 0 {
                return;
            }
            if let Node::Expression(Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            }) = node
            {
                let left = base_columns(left);
                let right = base_columns(right);
                self.found = !left.is_empty() && !right.is_empty() && left != right;
            }
        }
    }

    let mut finder = OrFinder::default();
    walk_expr(selection, TraversalContext::default(), &mut finder);
    finder.found
}

/// Lower-cased column names of an expression, outside function calls and subqueries
fn base_columns(expr: &Expr) -> BTreeSet<String> {
    #[derive(Default)]
    struct BaseColumns {
        columns: BTreeSet<String>,
    }

    impl Visitor for BaseColumns {
        fn enter(&mut self, node: Node<'_>, ctx: &TraversalContext) {
            if let Node::ColumnRef(column) = node
                && !ctx.in_function()
                && ctx.subquery_depth == 0
            {
                self.columns.insert(column.name.to_lowercase());
            }
        }
    }

    let mut collector = BaseColumns::default();
    walk_expr(expr, TraversalContext::default(), &mut collector);
    collector.columns
}

#[cfg(test)]
mod tests;
