//! Column Usage Extraction
//!
//! A single walk over a statement that records, for every table, the columns it
//! contributes and the clauses they appear in. Column qualifiers are resolved
//! against the FROM lists of the enclosing query blocks first (innermost outward)
//! and then against the statement-wide [`AliasMap`]. References that cannot be
//! pinned to one table are kept under a synthetic [`TableKey`] so nothing is lost.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::AliasMap;
use crate::syntax::{
    ColumnRef, Node, ResultColumn, Statement, TableRef, TraversalContext, Visitor,
    walk_statement,
};

/// Key of a usage record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TableKey {
    /// A canonical table name
    Known(String),
    /// A qualifier that matched no table in scope
    UnresolvedQualifier(String),
    /// An unqualified column with several candidate tables
    Ambiguous,
}

impl TableKey {
    pub fn known(name: impl Into<String>) -> Self {
        Self::Known(name.into())
    }

    pub fn known_name(&self) -> Option<&str> {
        match self {
            Self::Known(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(name) => f.write_str(name),
            Self::UnresolvedQualifier(qualifier) => write!(f, "?({qualifier})"),
            Self::Ambiguous => f.write_str("?(Ambiguous)"),
        }
    }
}

impl From<TableKey> for String {
    fn from(key: TableKey) -> Self {
        key.to_string()
    }
}

impl From<String> for TableKey {
    fn from(text: String) -> Self {
        if text == "?(Ambiguous)" {
            return Self::Ambiguous;
        }
        if let Some(qualifier) = text.strip_prefix("?(").and_then(|rest| rest.strip_suffix(')')) {
            return Self::UnresolvedQualifier(qualifier.to_string());
        }
        Self::Known(text)
    }
}

/// Columns one table contributes to a statement
///
/// Sets keep the case and first-seen order of the source text. Lookups through
/// the `*_contains` helpers ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableUsage {
    /// First alias the table was bound to
    pub alias_used: Option<String>,
    pub all_columns: IndexSet<String>,
    pub where_columns: IndexSet<String>,
    /// Always a subset of `where_columns`
    pub function_where_columns: IndexSet<String>,
    pub group_by_columns: IndexSet<String>,
    pub order_by_columns: IndexSet<String>,
}

impl TableUsage {
    /// Records a WHERE column, wrapped in a function call or not
    pub fn record_where(&mut self, column: &str, in_function: bool) {
        self.where_columns.insert(column.to_string());
        if in_function {
            self.function_where_columns.insert(column.to_string());
        }
    }

    pub fn where_contains(&self, column: &str) -> bool {
        contains_ignore_case(&self.where_columns, column)
    }

    pub fn function_where_contains(&self, column: &str) -> bool {
        contains_ignore_case(&self.function_where_columns, column)
    }

    /// WHERE columns that also appear wrapped in a function, in WHERE order
    pub fn functions_on_where_columns(&self) -> Vec<&str> {
        self.where_columns
            .iter()
            .filter(|column| self.function_where_contains(column))
            .map(String::as_str)
            .collect()
    }
}

fn contains_ignore_case(set: &IndexSet<String>, column: &str) -> bool {
    set.iter().any(|c| c.eq_ignore_ascii_case(column))
}

/// Usage records of one statement, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableUsages {
    tables: IndexMap<TableKey, TableUsage>,
}

impl TableUsages {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for a key, created empty on first use
    pub fn entry(&mut self, key: TableKey) -> &mut TableUsage {
        self.tables.entry(key).or_default()
    }

    pub fn get(&self, key: &TableKey) -> Option<&TableUsage> {
        self.tables.get(key)
    }

    /// The record of a canonical table, matched ignoring case
    pub fn get_known(&self, table: &str) -> Option<&TableUsage> {
        self.tables
            .iter()
            .find(|(key, _)| {
                key.known_name()
                    .is_some_and(|name| name.eq_ignore_ascii_case(table))
            })
            .map(|(_, usage)| usage)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableKey, &TableUsage)> {
        self.tables.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TableKey> {
        self.tables.keys()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Sum of WHERE column set sizes across every record
    pub fn total_where_columns(&self) -> usize {
        self.tables.values().map(|u| u.where_columns.len()).sum()
    }

    /// Sum of function-wrapped WHERE column set sizes across every record
    pub fn total_function_where_columns(&self) -> usize {
        self.tables
            .values()
            .map(|u| u.function_where_columns.len())
            .sum()
    }
}

/// Extracts per-table column usage from a statement
pub fn extract(statement: &Statement, aliases: &AliasMap) -> TableUsages {
    let mut collector = UsageCollector {
        aliases,
        scopes: Vec::new(),
        usages: TableUsages::new(),
    };
    walk_statement(statement, &mut collector);

    tracing::debug!(
        tables = collector.usages.len(),
        where_columns = collector.usages.total_where_columns(),
        "extracted column usage"
    );
    collector.usages
}

/// A FROM-list entry visible to column references
struct Binding {
    binding: String,
    table: String,
}

struct UsageCollector<'a> {
    aliases: &'a AliasMap,
    /// FROM lists of the enclosing query blocks, innermost last
    scopes: Vec<Vec<Binding>>,
    usages: TableUsages,
}

impl UsageCollector<'_> {
    fn push_scope<'t>(&mut self, tables: impl IntoIterator<Item = &'t TableRef>) {
        let mut scope = Vec::new();
        for table in tables {
            let usage = self.usages.entry(TableKey::known(&table.name));
            if usage.alias_used.is_none() {
                usage.alias_used = table.alias.clone();
            }
            scope.push(Binding {
                binding: table.binding().to_string(),
                table: table.name.clone(),
            });
        }
        self.scopes.push(scope);
    }

    fn resolve(&self, qualifier: Option<&str>) -> TableKey {
        match qualifier {
            Some(qualifier) => self.resolve_qualified(qualifier),
            None => self.resolve_unqualified(),
        }
    }

    fn resolve_qualified(&self, qualifier: &str) -> TableKey {
        let in_scope = self.scopes.iter().rev().flatten().find(|b| {
            b.binding.eq_ignore_ascii_case(qualifier) || b.table.eq_ignore_ascii_case(qualifier)
        });
        if let Some(binding) = in_scope {
            return TableKey::known(&binding.table);
        }

        self.aliases
            .resolve(qualifier)
            .or_else(|| self.aliases.find_table(qualifier))
            .map(TableKey::known)
            .unwrap_or_else(|| TableKey::UnresolvedQualifier(qualifier.to_string()))
    }

    fn resolve_unqualified(&self) -> TableKey {
        let candidates: Vec<&str> = match self.scopes.iter().rev().find(|s| !s.is_empty()) {
            Some(scope) => {
                let mut tables: Vec<&str> = Vec::new();
                for binding in scope {
                    if !tables.contains(&binding.table.as_str()) {
                        tables.push(&binding.table);
                    }
                }
                tables
            }
            None => self.aliases.canonical_tables(),
        };

        match candidates.as_slice() {
            [only] => TableKey::known(*only),
            _ => TableKey::Ambiguous,
        }
    }

    fn record_column(&mut self, column: &ColumnRef, ctx: &TraversalContext) {
        let key = self.resolve(column.qualifier.as_deref());
        let usage = self.usages.entry(key);
        usage.all_columns.insert(column.name.clone());
        if ctx.in_where {
            usage.record_where(&column.name, ctx.in_function());
        }
        if ctx.in_group_by {
            usage.group_by_columns.insert(column.name.clone());
        }
        if ctx.in_order_by {
            usage.order_by_columns.insert(column.name.clone());
        }
    }

    fn record_wildcard(&mut self, qualifier: Option<&str>) {
        match qualifier {
            Some(qualifier) => {
                let key = self.resolve_qualified(qualifier);
                self.usages
                    .entry(key)
                    .all_columns
                    .insert(format!("*({qualifier}.*)"));
            }
            None => {
                let tables: Vec<String> = self
                    .scopes
                    .last()
                    .map(|scope| scope.iter().map(|b| b.table.clone()).collect())
                    .unwrap_or_default();
                for table in tables {
                    self.usages
                        .entry(TableKey::Known(table))
                        .all_columns
                        .insert("*".to_string());
                }
            }
        }
    }

    /// Records a DML target column (`SET col = ...`, `INSERT INTO t (col)`)
    fn record_target_column(&mut self, table: &str, column: &str) {
        let name = column.rsplit('.').next().unwrap_or(column);
        self.usages
            .entry(TableKey::known(table))
            .all_columns
            .insert(name.to_string());
    }
}

impl Visitor for UsageCollector<'_> {
    fn enter(&mut self, node: Node<'_>, ctx: &TraversalContext) {
        match node {
            Node::Statement(Statement::Update(update)) => {
                self.push_scope(std::iter::once(&update.table).chain(&update.from));
            }
            Node::Statement(Statement::Delete(delete)) => {
                self.push_scope(std::iter::once(&delete.table).chain(&delete.from));
            }
            Node::Statement(Statement::Insert(insert)) => {
                let target = TableRef::named(&insert.table);
                self.push_scope(std::iter::once(&target));
                for column in &insert.columns {
                    self.record_target_column(&insert.table, column);
                }
            }
            Node::Select(select) => self.push_scope(&select.tables),
            Node::Assignment(assignment) => {
                if let Some(target) = self.scopes.first().and_then(|s| s.first()) {
                    let table = target.table.clone();
                    self.record_target_column(&table, &assignment.column);
                }
            }
            Node::ColumnRef(column) => self.record_column(column, ctx),
            Node::ResultColumn(ResultColumn::Wildcard { qualifier }) => {
                self.record_wildcard(qualifier.as_deref());
            }
            _ => {}
        }
    }

    fn exit(&mut self, node: Node<'_>, _ctx: &TraversalContext) {
        match node {
            Node::Statement(Statement::Update(_) | Statement::Delete(_) | Statement::Insert(_))
            | Node::Select(_) => {
                self.scopes.pop();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests;
