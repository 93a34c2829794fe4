//! Alias Resolution
//!
//! Maps the lower-cased alias (or bare name) of every table a statement reads or
//! writes to its canonical table name. Nested query blocks are registered before
//! the blocks enclosing them, and within one block in source order, so the outermost
//! use of an alias wins and a block that reuses an alias keeps its last table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::syntax::{
    InsertStatement, Node, Statement, TableRef, TraversalContext, Visitor, walk_statement,
};

/// Lower-cased alias -> canonical table name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasMap {
    entries: IndexMap<String, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map for every FROM-list table of a statement
    ///
    /// Covers joined, nested and derived tables, the FROM lists of subqueries and
    /// CTEs, and the target table of INSERT / UPDATE / DELETE. Never fails; a
    /// statement without tables yields an empty map.
    pub fn build(statement: &Statement) -> Self {
        let mut collector = AliasCollector::default();
        walk_statement(statement, &mut collector);

        // Stable sort: deepest blocks first, source order within a block
        collector.found.sort_by(|(a, _, _), (b, _, _)| b.cmp(a));

        let mut map = Self::new();
        for (_, alias, table) in &collector.found {
            map.insert(alias, table);
        }
        tracing::debug!(entries = map.len(), "built alias map");
        map
    }

    /// Registers `alias -> table`, replacing any previous entry for the alias
    pub fn insert(&mut self, alias: &str, table: &str) {
        self.entries.insert(alias.to_lowercase(), table.to_string());
    }

    /// Registers a FROM-list entry under its binding
    pub fn register(&mut self, table: &TableRef) {
        if is_addressable(table) {
            self.insert(table.binding(), &table.name);
        }
    }

    /// Resolves an alias or bare table name, case-insensitively
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.entries.get(&alias.to_lowercase()).map(String::as_str)
    }

    /// Resolves a table name as the database reports it in a plan
    ///
    /// Plans name unaliased tables without their schema, so `orders` also finds a
    /// `shop.orders` registered under its qualified name, provided only one
    /// canonical table has that simple name.
    pub fn resolve_reported(&self, name: &str) -> Option<&str> {
        if let Some(table) = self.resolve(name) {
            return Some(table);
        }

        let mut matches = self
            .canonical_tables()
            .into_iter()
            .filter(|table| simple_name(table).eq_ignore_ascii_case(name));
        match (matches.next(), matches.next()) {
            (Some(table), None) => Some(table),
            _ => None,
        }
    }

    /// Distinct canonical table names, in registration order
    pub fn canonical_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for table in self.entries.values() {
            if !tables.contains(&table.as_str()) {
                tables.push(table);
            }
        }
        tables
    }

    /// Finds a canonical table by name, ignoring case
    pub fn find_table(&self, name: &str) -> Option<&str> {
        self.entries
            .values()
            .find(|table| table.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Every alias registered for a canonical table
    pub fn aliases_of(&self, table: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, canonical)| canonical.eq_ignore_ascii_case(table))
            .map(|(alias, _)| alias.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(alias, table)| (alias.as_str(), table.as_str()))
    }
}

/// The last dotted part of a possibly schema-qualified table name
pub fn simple_name(table: &str) -> &str {
    table.rsplit('.').next().unwrap_or(table)
}

/// An unaliased derived table cannot be referenced
fn is_addressable(table: &TableRef) -> bool {
    !(table.is_derived() && table.alias.is_none())
}

#[derive(Default)]
struct AliasCollector {
    /// (query depth, binding, table name)
    found: Vec<(u32, String, String)>,
}

impl Visitor for AliasCollector {
    fn enter(&mut self, node: Node<'_>, ctx: &TraversalContext) {
        match node {
            Node::Statement(Statement::Insert(InsertStatement { table, .. })) => {
                self.found.push((0, table.clone(), table.clone()));
            }
            Node::TableRef(table) if is_addressable(table) => {
                self.found.push((
                    ctx.subquery_depth,
                    table.binding().to_string(),
                    table.name.clone(),
                ));
            }
            _ => {}
        }
    }
}
