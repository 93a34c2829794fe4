//! Query Statistics
//!
//! Structural counters gathered in a second walk over a statement. The result is an
//! open, ordered map so callers can render it generically; the hint engine reads
//! the handful of keys it needs through the typed getters.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::syntax::{
    Expr, InsertSource, Node, ResultColumn, SelectStatement, Statement, TraversalContext,
    Visitor, walk_select,
};
use crate::usage::TableUsages;

/// Statistic names
pub mod keys {
    pub const SELECT_ITEM_COUNT: &str = "selectItemCount";
    pub const USES_SELECT_STAR: &str = "usesSelectStar";
    pub const TABLE_COUNT: &str = "tableCount";
    pub const JOIN_COUNT: &str = "joinCount";
    pub const JOIN_TYPES: &str = "joinTypes";
    pub const HAS_WHERE_CLAUSE: &str = "hasWhereClause";
    pub const WHERE_CONDITION_COMPLEXITY: &str = "whereConditionComplexity";
    pub const HAS_GROUP_BY_CLAUSE: &str = "hasGroupByClause";
    pub const GROUP_BY_ITEM_COUNT: &str = "groupByItemCount";
    pub const HAS_ORDER_BY_CLAUSE: &str = "hasOrderByClause";
    pub const ORDER_BY_ITEM_COUNT: &str = "orderByItemCount";
    pub const HAS_LIMIT_CLAUSE: &str = "hasLimitClause";
    pub const IS_DISTINCT: &str = "isDistinct";
    pub const SET_OPERATION: &str = "setOperation";
    pub const FUNCTION_CALL_COUNT: &str = "functionCallCount";
    pub const WINDOW_FUNCTION_COUNT: &str = "windowFunctionCount";
    pub const AGGREGATE_FUNCTION_COUNT: &str = "aggregateFunctionCount";
    pub const TOTAL_WHERE_COLUMNS_USED: &str = "totalWhereColumnsUsed";
    pub const TOTAL_FUNCTIONS_ON_WHERE_COLUMNS: &str = "totalFunctionsOnWhereColumns";

    pub const TARGET_TABLE: &str = "targetTable";
    pub const COLUMN_COUNT: &str = "columnCount";
    pub const INSERT_SOURCE: &str = "insertSource";
    pub const VALUES_ROW_COUNT: &str = "valuesRowCount";
    pub const SET_COLUMN_COUNT: &str = "setColumnCount";
    pub const STATEMENT_KIND: &str = "statementKind";
}

/// Functions counted as aggregates
const AGGREGATE_FUNCTIONS: &[&str] = &[
    "COUNT",
    "SUM",
    "AVG",
    "MIN",
    "MAX",
    "GROUP_CONCAT",
    "STRING_AGG",
    "ARRAY_AGG",
    "LISTAGG",
    "JSON_AGG",
    "JSON_ARRAYAGG",
    "STDDEV",
    "VARIANCE",
    "BIT_AND",
    "BIT_OR",
    "BOOL_AND",
    "BOOL_OR",
];

/// A single statistic value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Bool(bool),
    Count(usize),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Count(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

impl From<bool> for StatValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<usize> for StatValue {
    fn from(value: usize) -> Self {
        Self::Count(value)
    }
}

impl From<String> for StatValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for StatValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for StatValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

/// Named statistics of one statement, in collection order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryStatistics {
    values: IndexMap<String, StatValue>,
}

impl QueryStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<StatValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&StatValue> {
        self.values.get(key)
    }

    /// A boolean statistic; false when missing
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(StatValue::Bool(true)))
    }

    /// A counter; zero when missing
    pub fn count(&self, key: &str) -> usize {
        match self.values.get(key) {
            Some(StatValue::Count(value)) => *value,
            _ => 0,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(StatValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> &[String] {
        match self.values.get(key) {
            Some(StatValue::List(values)) => values,
            _ => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StatValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Collects the statistics matching a statement's kind
pub fn collect(statement: &Statement) -> QueryStatistics {
    match statement {
        Statement::Select(select) => collect_select(select),
        _ => collect_general(statement),
    }
}

/// Structural statistics of a SELECT
pub fn collect_select(select: &SelectStatement) -> QueryStatistics {
    let mut counter = NodeCounter::default();
    walk_select(select, TraversalContext::default(), &mut counter);

    let mut stats = QueryStatistics::new();
    stats.set(keys::SELECT_ITEM_COUNT, select.projection.len());
    stats.set(keys::USES_SELECT_STAR, counter.select_stars > 0);
    stats.set(keys::TABLE_COUNT, select.tables.len());
    stats.set(keys::JOIN_COUNT, select.joins.len());
    stats.set(
        keys::JOIN_TYPES,
        select
            .joins
            .iter()
            .map(|join| join.kind.as_str().to_string())
            .collect::<Vec<_>>(),
    );
    stats.set(keys::HAS_WHERE_CLAUSE, select.has_where());
    stats.set(keys::WHERE_CONDITION_COMPLEXITY, counter.where_conditions);
    stats.set(keys::HAS_GROUP_BY_CLAUSE, !select.group_by.is_empty());
    stats.set(keys::GROUP_BY_ITEM_COUNT, select.group_by.len());
    stats.set(keys::HAS_ORDER_BY_CLAUSE, !select.order_by.is_empty());
    stats.set(keys::ORDER_BY_ITEM_COUNT, select.order_by.len());
    stats.set(keys::HAS_LIMIT_CLAUSE, select.has_limit);
    stats.set(keys::IS_DISTINCT, select.distinct);
    stats.set(keys::SET_OPERATION, select.set_operator.as_deref().unwrap_or("None"));
    stats.set(keys::FUNCTION_CALL_COUNT, counter.functions);
    stats.set(keys::WINDOW_FUNCTION_COUNT, counter.window_functions);
    stats.set(keys::AGGREGATE_FUNCTION_COUNT, counter.aggregates);

    tracing::debug!(
        tables = select.tables.len(),
        joins = select.joins.len(),
        where_complexity = counter.where_conditions,
        "collected select statistics"
    );
    stats
}

/// Basic statistics for INSERT, UPDATE, DELETE and everything else
pub fn collect_general(statement: &Statement) -> QueryStatistics {
    let mut stats = QueryStatistics::new();
    match statement {
        Statement::Insert(insert) => {
            stats.set(keys::TARGET_TABLE, insert.table.as_str());
            stats.set(keys::COLUMN_COUNT, insert.columns.len());
            let source = match &insert.source {
                InsertSource::Select(_) => "SELECT Subquery".to_string(),
                InsertSource::Values { rows } => {
                    stats.set(keys::VALUES_ROW_COUNT, *rows);
                    format!("VALUES Clause ({rows} rows)")
                }
                InsertSource::Default => "Default".to_string(),
            };
            stats.set(keys::INSERT_SOURCE, source);
        }
        Statement::Update(update) => {
            stats.set(keys::TARGET_TABLE, update.table.name.as_str());
            stats.set(keys::SET_COLUMN_COUNT, update.assignments.len());
            stats.set(keys::HAS_WHERE_CLAUSE, update.selection.is_some());
        }
        Statement::Delete(delete) => {
            stats.set(keys::TARGET_TABLE, delete.table.name.as_str());
            stats.set(keys::HAS_WHERE_CLAUSE, delete.selection.is_some());
        }
        Statement::Select(_) | Statement::Other(_) => {
            stats.set(keys::STATEMENT_KIND, "DDL/Custom");
        }
    }
    stats
}

/// Adds the WHERE column totals derived from the usage records
pub fn attach_usage_totals(stats: &mut QueryStatistics, usages: &TableUsages) {
    stats.set(keys::TOTAL_WHERE_COLUMNS_USED, usages.total_where_columns());
    stats.set(keys::TOTAL_FUNCTIONS_ON_WHERE_COLUMNS, usages.total_function_where_columns());
}

pub fn is_aggregate(name: &str) -> bool {
    AGGREGATE_FUNCTIONS
        .iter()
        .any(|aggregate| aggregate.eq_ignore_ascii_case(name))
}

#[derive(Default)]
struct NodeCounter {
    functions: usize,
    window_functions: usize,
    aggregates: usize,
    select_stars: usize,
    where_conditions: usize,
}

impl Visitor for NodeCounter {
    fn enter(&mut self, node: Node<'_>, ctx: &TraversalContext) {
        match node {
            Node::FunctionCall(function) => {
                self.functions += 1;
                if function.windowed {
                    self.window_functions += 1;
                }
                if is_aggregate(&function.name) {
                    self.aggregates += 1;
                }
            }
            Node::ResultColumn(ResultColumn::Wildcard { .. }) => self.select_stars += 1,
            Node::Expression(expr) if ctx.in_where && is_condition(expr) => {
                self.where_conditions += 1;
            }
            _ => {}
        }
    }
}

/// Expression kinds that add to WHERE complexity
fn is_condition(expr: &Expr) -> bool {
    match expr {
        Expr::Binary { op, .. } => op.is_logical() || op.is_comparison(),
        Expr::Nested(_)
        | Expr::Like { .. }
        | Expr::IsNull { .. }
        | Expr::Between { .. }
        | Expr::InList { .. }
        | Expr::InSubquery { .. } => true,
        _ => false,
    }
}
