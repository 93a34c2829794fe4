//! Statement Model
//!
//! A closed, vendor-neutral view of one parsed SQL statement. The analysis passes
//! (alias resolution, column usage, statistics, hints) only ever see these types;
//! the `sqlparser` AST stays behind the [`parser`] adapter.
//!
//! - [`Statement`] discriminates the statement kind
//! - [`Expr`] is the closed set of expression shapes the passes care about
//! - [`walk`] provides the single recursive traversal shared by every pass

pub mod parser;
pub mod walk;

pub use parser::{ParsedStatement, SyntaxError, Vendor, parse};
pub use walk::{Node, TraversalContext, Visitor, walk_expr, walk_select, walk_statement};

use serde::{Deserialize, Serialize};

/// Kind of a parsed statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Other => "OTHER",
        }
    }

    /// Whether the database can produce an EXPLAIN plan for this kind
    pub fn is_explainable(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// A parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<SelectStatement>),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Other(OtherStatement),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Select(_) => StatementKind::Select,
            Self::Insert(_) => StatementKind::Insert,
            Self::Update(_) => StatementKind::Update,
            Self::Delete(_) => StatementKind::Delete,
            Self::Other(_) => StatementKind::Other,
        }
    }

    /// Display name of the statement type (`SELECT`, `CREATE TABLE`, ...)
    pub fn type_name(&self) -> &str {
        match self {
            Self::Other(other) => &other.kind,
            _ => self.kind().as_str(),
        }
    }

    pub fn as_select(&self) -> Option<&SelectStatement> {
        match self {
            Self::Select(select) => Some(select),
            _ => None,
        }
    }
}

/// A SELECT query block
///
/// For set operations (`UNION`, `EXCEPT`, ...) the first branch's clauses live on
/// this value and the remaining branches are kept in `set_branches`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectStatement {
    pub ctes: Vec<CommonTableExpr>,
    pub projection: Vec<ResultColumn>,
    /// Every table of the FROM list in source order, joined tables included
    pub tables: Vec<TableRef>,
    pub joins: Vec<Join>,
    pub selection: Option<Expr>,
    pub group_by: Vec<ClauseItem>,
    pub having: Option<Expr>,
    pub order_by: Vec<ClauseItem>,
    pub distinct: bool,
    pub has_limit: bool,
    pub set_operator: Option<String>,
    pub set_branches: Vec<SelectStatement>,
}

impl SelectStatement {
    pub fn has_where(&self) -> bool {
        self.selection.is_some()
    }
}

/// A named subquery from a `WITH` clause
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpr {
    pub name: String,
    pub query: SelectStatement,
}

/// A FROM-list entry
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// Table name as written, schema qualification included
    pub name: String,
    pub alias: Option<String>,
    /// Body of a derived table (`(SELECT ...) AS x`)
    pub subquery: Option<Box<SelectStatement>>,
}

impl TableRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            subquery: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name columns use to qualify this table: the alias if any, else the name
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_derived(&self) -> bool {
        self.subquery.is_some()
    }
}

/// Kind of an explicit JOIN clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// `JOIN` / `INNER JOIN`
    Inner,
    /// `LEFT [OUTER] JOIN`
    Left,
    /// `RIGHT [OUTER] JOIN`
    Right,
    /// `FULL [OUTER] JOIN`
    Full,
    /// `CROSS JOIN`
    Cross,
    /// `LEFT SEMI` / `RIGHT SEMI` joins
    Semi,
    /// `LEFT ANTI` / `RIGHT ANTI` joins
    Anti,
    /// `CROSS APPLY` / `OUTER APPLY`
    Apply,
    /// Any other join operator
    Other,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
            Self::Cross => "CROSS",
            Self::Semi => "SEMI",
            Self::Anti => "ANTI",
            Self::Apply => "APPLY",
            Self::Other => "OTHER",
        }
    }
}

/// An explicit JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    /// Binding (alias or name) of the joined table
    pub table: String,
    pub condition: Option<Expr>,
}

/// A GROUP BY or ORDER BY item with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseItem {
    pub expr: Expr,
    pub text: String,
}

impl ClauseItem {
    pub fn is_bare_column(&self) -> bool {
        matches!(self.expr, Expr::Column(_))
    }
}

/// A SELECT-list entry
#[derive(Debug, Clone, PartialEq)]
pub enum ResultColumn {
    /// `*` or `qualifier.*`
    Wildcard { qualifier: Option<String> },
    Expr { expr: Expr, alias: Option<String> },
}

/// A column reference, optionally qualified
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(qualifier: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.map(str::to_string),
            name: name.into(),
        }
    }
}

/// A function invocation
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    /// Carries an OVER clause
    pub windowed: bool,
}

/// Binary operators the passes distinguish
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Other(String),
}

impl BinaryOp {
    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    /// Literal as written, quotes included
    Literal(String),
    Function(FunctionCall),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: String,
        expr: Box<Expr>,
    },
    /// Parenthesized expression
    Nested(Box<Expr>),
    /// `LIKE` / `ILIKE`
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<SelectStatement>,
        negated: bool,
    },
    Exists {
        subquery: Box<SelectStatement>,
        negated: bool,
    },
    Subquery(Box<SelectStatement>),
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<(Expr, Expr)>,
        else_result: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        data_type: String,
    },
    /// `*` as a function argument (`COUNT(*)`)
    Wildcard,
    /// Anything else, kept as source text
    Raw(String),
}

impl Expr {
    pub fn column(qualifier: Option<&str>, name: &str) -> Self {
        Self::Column(ColumnRef::new(qualifier, name))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn function(name: &str, args: Vec<Expr>) -> Self {
        Self::Function(FunctionCall {
            name: name.to_string(),
            args,
            windowed: false,
        })
    }
}

/// Source of an INSERT
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values { rows: usize },
    Select(Box<SelectStatement>),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub source: InsertSource,
}

/// One `SET column = value` of an UPDATE
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: TableRef,
    pub assignments: Vec<Assignment>,
    /// Extra tables from `UPDATE ... FROM`
    pub from: Vec<TableRef>,
    pub selection: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: TableRef,
    /// Extra tables from `DELETE ... USING` or multi-table FROM lists
    pub from: Vec<TableRef>,
    pub selection: Option<Expr>,
}

/// DDL and every other statement without a dedicated analyzer
#[derive(Debug, Clone, PartialEq)]
pub struct OtherStatement {
    /// Leading keywords, e.g. `CREATE TABLE`
    pub kind: String,
}
