//! sqlparser Adapter
//!
//! Maps a [`Vendor`] to its `sqlparser` dialect, parses a script and lowers every
//! statement into the closed model from [`crate::syntax`]. Parser failures are
//! turned into [`SyntaxError`] values carrying line, column and the offending token.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlparser::ast;
use sqlparser::dialect::{
    Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser;
use thiserror::Error;

use super::{
    Assignment, BinaryOp, ClauseItem, CommonTableExpr, DeleteStatement, Expr, FunctionCall,
    InsertSource, InsertStatement, Join, JoinKind, OtherStatement, ResultColumn, SelectStatement,
    Statement, TableRef, UpdateStatement,
};

/// Database vendor a statement is parsed for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// MySQL and MariaDB
    MySql,
    /// PostgreSQL
    PostgreSql,
    /// SQLite
    Sqlite,
    /// Microsoft SQL Server
    MsSql,
    /// Oracle, parsed with the generic dialect
    Oracle,
    /// Plain ANSI SQL
    #[default]
    Ansi,
}

impl Vendor {
    /// Detects the vendor from a connection URL (`jdbc:mysql://...`, `postgres://...`)
    ///
    /// Unknown schemes fall back to [`Vendor::Ansi`].
    pub fn from_connection_url(url: &str) -> Self {
        let lower = url.trim().to_lowercase();
        let scheme = lower.strip_prefix("jdbc:").unwrap_or(&lower);

        if scheme.starts_with("mysql:") || scheme.starts_with("mariadb:") {
            Self::MySql
        } else if scheme.starts_with("postgresql:") || scheme.starts_with("postgres:") {
            Self::PostgreSql
        } else if scheme.starts_with("oracle:") {
            Self::Oracle
        } else if scheme.starts_with("sqlserver:") || scheme.starts_with("mssql:") {
            Self::MsSql
        } else if scheme.starts_with("sqlite:") {
            Self::Sqlite
        } else {
            Self::Ansi
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::PostgreSql => "PostgreSQL",
            Self::Sqlite => "SQLite",
            Self::MsSql => "SQL Server",
            Self::Oracle => "Oracle",
            Self::Ansi => "ANSI SQL",
        }
    }

    /// The `sqlparser` dialect used for this vendor
    pub fn dialect(&self) -> Box<dyn Dialect> {
        match self {
            Self::MySql => Box::new(MySqlDialect {}),
            Self::PostgreSql => Box::new(PostgreSqlDialect {}),
            Self::Sqlite => Box::new(SQLiteDialect {}),
            Self::MsSql => Box::new(MsSqlDialect {}),
            Self::Oracle | Self::Ansi => Box::new(GenericDialect {}),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown database vendor: {0}")]
pub struct UnknownVendor(pub String);

impl FromStr for Vendor {
    type Err = UnknownVendor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgres" | "postgresql" | "pg" => Ok(Self::PostgreSql),
            "sqlite" => Ok(Self::Sqlite),
            "mssql" | "sqlserver" => Ok(Self::MsSql),
            "oracle" => Ok(Self::Oracle),
            "ansi" | "generic" => Ok(Self::Ansi),
            _ => Err(UnknownVendor(s.to_string())),
        }
    }
}

/// A statement that failed to parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub line: u64,
    pub column: u64,
    pub near_text: String,
    /// Full parser message
    pub message: String,
}

static POSITION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Line: (\d+), Column: (\d+)").ok());
static FOUND_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"found: (.+?) at Line").ok());

impl SyntaxError {
    /// Extracts position and token from a `sqlparser` error message
    pub fn from_parser_message(message: &str) -> Self {
        let (line, column) = POSITION_PATTERN
            .as_ref()
            .and_then(|re| re.captures(message))
            .map(|caps| {
                let number = |i: usize| {
                    caps.get(i)
                        .and_then(|m| m.as_str().parse::<u64>().ok())
                        .unwrap_or(0)
                };
                (number(1), number(2))
            })
            .unwrap_or((0, 0));

        let near_text = FOUND_PATTERN
            .as_ref()
            .and_then(|re| re.captures(message))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        Self {
            line,
            column,
            near_text,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Line: {}, Col: {} (Near '{}')",
            self.line, self.column, self.near_text
        )
    }
}

/// One statement of a parsed script
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub statement: Statement,
    /// Canonical SQL text of the statement, suitable for prefixing with `EXPLAIN`
    pub sql: String,
}

/// Parses a script into lowered statements
///
/// Whitespace-only input yields an empty list.
pub fn parse(sql: &str, vendor: Vendor) -> Result<Vec<ParsedStatement>, Vec<SyntaxError>> {
    if sql.trim().is_empty() {
        return Ok(Vec::new());
    }

    let dialect = vendor.dialect();
    match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) => {
            tracing::debug!(
                vendor = %vendor,
                statement_count = statements.len(),
                "parsed SQL script"
            );
            Ok(statements
                .iter()
                .map(|statement| ParsedStatement {
                    statement: lower_statement(statement),
                    sql: statement.to_string(),
                })
                .collect())
        }
        Err(err) => {
            let error = SyntaxError::from_parser_message(&err.to_string());
            tracing::debug!(
                vendor = %vendor,
                line = error.line,
                column = error.column,
                "SQL parse failed"
            );
            Err(vec![error])
        }
    }
}

fn lower_statement(statement: &ast::Statement) -> Statement {
    match statement {
        ast::Statement::Query(query) => Statement::Select(Box::new(lower_query(query))),
        ast::Statement::Insert(insert) => Statement::Insert(lower_insert(insert)),
        ast::Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => {
            let mut from = SelectStatement::default();
            collect_from(std::slice::from_ref(table), &mut from);
            let mut tables = from.tables.into_iter();
            let target = tables
                .next()
                .unwrap_or_else(|| TableRef::named("UNKNOWN"));

            Statement::Update(UpdateStatement {
                table: target,
                assignments: assignments
                    .iter()
                    .map(|assignment| Assignment {
                        column: assignment.target.to_string(),
                        value: lower_expr(&assignment.value),
                    })
                    .collect(),
                from: tables.collect(),
                selection: selection.as_ref().map(lower_expr),
            })
        }
        ast::Statement::Delete(delete) => Statement::Delete(lower_delete(delete)),
        other => Statement::Other(OtherStatement {
            kind: leading_keywords(&other.to_string()),
        }),
    }
}

fn lower_insert(insert: &ast::Insert) -> InsertStatement {
    let source = match &insert.source {
        Some(query) => match query.body.as_ref() {
            ast::SetExpr::Values(values) => InsertSource::Values {
                rows: values.rows.len(),
            },
            _ => InsertSource::Select(Box::new(lower_query(query))),
        },
        None => InsertSource::Default,
    };

    InsertStatement {
        table: object_name(&insert.table_name),
        columns: insert.columns.iter().map(|c| c.value.clone()).collect(),
        source,
    }
}

fn lower_delete(delete: &ast::Delete) -> DeleteStatement {
    let from_tables = match &delete.from {
        ast::FromTable::WithFromKeyword(tables) | ast::FromTable::WithoutKeyword(tables) => tables,
    };

    let mut from = SelectStatement::default();
    collect_from(from_tables, &mut from);
    if let Some(using) = &delete.using {
        collect_from(using, &mut from);
    }

    // `DELETE t1 FROM t1 JOIN t2 ...` names its target before FROM
    let target_position = delete
        .tables
        .first()
        .map(object_name)
        .and_then(|target| {
            from.tables
                .iter()
                .position(|t| t.binding().eq_ignore_ascii_case(&target))
        })
        .unwrap_or(0);

    let mut tables = from.tables;
    let table = if tables.is_empty() {
        delete
            .tables
            .first()
            .map(|name| TableRef::named(object_name(name)))
            .unwrap_or_else(|| TableRef::named("UNKNOWN"))
    } else {
        tables.remove(target_position)
    };

    DeleteStatement {
        table,
        from: tables,
        selection: delete.selection.as_ref().map(lower_expr),
    }
}

fn lower_query(query: &ast::Query) -> SelectStatement {
    let mut select = lower_set_expr(&query.body);

    if let Some(with) = &query.with {
        select.ctes = with
            .cte_tables
            .iter()
            .map(|cte| CommonTableExpr {
                name: cte.alias.name.value.clone(),
                query: lower_query(&cte.query),
            })
            .collect();
    }

    if let Some(order_by) = &query.order_by {
        select.order_by = order_by
            .exprs
            .iter()
            .map(|item| clause_item(&item.expr))
            .collect();
    }

    if query.limit.is_some() || query.fetch.is_some() {
        select.has_limit = true;
    }

    select
}

fn lower_set_expr(body: &ast::SetExpr) -> SelectStatement {
    match body {
        ast::SetExpr::Select(select) => lower_select(select),
        ast::SetExpr::Query(query) => lower_query(query),
        ast::SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right,
        } => {
            let mut first = lower_set_expr(left);
            let mut branch = lower_set_expr(right);
            let trailing = std::mem::take(&mut branch.set_branches);
            first.set_branches.push(branch);
            first.set_branches.extend(trailing);
            first.set_operator = Some(match set_quantifier {
                ast::SetQuantifier::None => op.to_string(),
                quantifier => format!("{op} {quantifier}"),
            });
            first
        }
        _ => SelectStatement::default(),
    }
}

fn lower_select(select: &ast::Select) -> SelectStatement {
    let mut out = SelectStatement {
        distinct: select.distinct.is_some(),
        has_limit: select.top.is_some(),
        ..SelectStatement::default()
    };

    out.projection = select
        .projection
        .iter()
        .map(|item| match item {
            ast::SelectItem::UnnamedExpr(expr) => ResultColumn::Expr {
                expr: lower_expr(expr),
                alias: None,
            },
            ast::SelectItem::ExprWithAlias { expr, alias } => ResultColumn::Expr {
                expr: lower_expr(expr),
                alias: Some(alias.value.clone()),
            },
            ast::SelectItem::QualifiedWildcard(name, _) => ResultColumn::Wildcard {
                qualifier: Some(object_name(name)),
            },
            ast::SelectItem::Wildcard(_) => ResultColumn::Wildcard { qualifier: None },
        })
        .collect();

    collect_from(&select.from, &mut out);
    out.selection = select.selection.as_ref().map(lower_expr);

    if let ast::GroupByExpr::Expressions(exprs, _) = &select.group_by {
        out.group_by = exprs.iter().map(clause_item).collect();
    }
    out.having = select.having.as_ref().map(lower_expr);

    out
}

fn collect_from(from: &[ast::TableWithJoins], out: &mut SelectStatement) {
    for table_with_joins in from {
        collect_table_factor(&table_with_joins.relation, out);

        for join in &table_with_joins.joins {
            let binding = collect_table_factor(&join.relation, out);
            let (kind, condition) = lower_join_operator(&join.join_operator);
            out.joins.push(Join {
                kind,
                table: binding.unwrap_or_default(),
                condition,
            });
        }
    }
}

/// Registers the table(s) of one FROM-list factor, returning the binding of the last one
fn collect_table_factor(factor: &ast::TableFactor, out: &mut SelectStatement) -> Option<String> {
    match factor {
        ast::TableFactor::Table { name, alias, .. } => {
            let table = TableRef {
                name: object_name(name),
                alias: alias.as_ref().map(|a| a.name.value.clone()),
                subquery: None,
            };
            let binding = table.binding().to_string();
            out.tables.push(table);
            Some(binding)
        }
        ast::TableFactor::Derived {
            subquery, alias, ..
        } => {
            let alias = alias.as_ref().map(|a| a.name.value.clone());
            let table = TableRef {
                name: alias.clone().unwrap_or_else(|| "(subquery)".to_string()),
                alias,
                subquery: Some(Box::new(lower_query(subquery))),
            };
            let binding = table.binding().to_string();
            out.tables.push(table);
            Some(binding)
        }
        ast::TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            collect_from(std::slice::from_ref(table_with_joins.as_ref()), out);
            out.tables.last().map(|t| t.binding().to_string())
        }
        _ => None,
    }
}

fn lower_join_operator(operator: &ast::JoinOperator) -> (JoinKind, Option<Expr>) {
    use ast::JoinOperator as Op;

    match operator {
        Op::Inner(constraint) => (JoinKind::Inner, join_condition(constraint)),
        Op::LeftOuter(constraint) => (JoinKind::Left, join_condition(constraint)),
        Op::RightOuter(constraint) => (JoinKind::Right, join_condition(constraint)),
        Op::FullOuter(constraint) => (JoinKind::Full, join_condition(constraint)),
        Op::CrossJoin => (JoinKind::Cross, None),
        Op::LeftSemi(constraint) | Op::RightSemi(constraint) => {
            (JoinKind::Semi, join_condition(constraint))
        }
        Op::LeftAnti(constraint) | Op::RightAnti(constraint) => {
            (JoinKind::Anti, join_condition(constraint))
        }
        Op::CrossApply | Op::OuterApply => (JoinKind::Apply, None),
        _ => (JoinKind::Other, None),
    }
}

fn join_condition(constraint: &ast::JoinConstraint) -> Option<Expr> {
    match constraint {
        ast::JoinConstraint::On(expr) => Some(lower_expr(expr)),
        _ => None,
    }
}

fn clause_item(expr: &ast::Expr) -> ClauseItem {
    ClauseItem {
        expr: lower_expr(expr),
        text: expr.to_string(),
    }
}

fn lower_expr(expr: &ast::Expr) -> Expr {
    use ast::Expr as E;

    match expr {
        E::Identifier(ident) => Expr::column(None, &ident.value),
        E::CompoundIdentifier(parts) => match parts.split_last() {
            Some((column, [])) => Expr::column(None, &column.value),
            Some((column, qualifier)) => {
                let qualifier = qualifier
                    .iter()
                    .map(|i| i.value.as_str())
                    .collect::<Vec<_>>()
                    .join(".");
                Expr::column(Some(&qualifier), &column.value)
            }
            None => Expr::Raw(String::new()),
        },
        E::Value(value) => Expr::Literal(value.to_string()),
        E::BinaryOp { left, op, right } => {
            Expr::binary(lower_binary_op(op), lower_expr(left), lower_expr(right))
        }
        E::UnaryOp { op, expr } => Expr::Unary {
            op: op.to_string(),
            expr: Box::new(lower_expr(expr)),
        },
        E::Nested(inner) => Expr::Nested(Box::new(lower_expr(inner))),
        E::Function(function) => Expr::Function(lower_function(function)),
        E::Like {
            negated,
            expr,
            pattern,
            ..
        }
        | E::ILike {
            negated,
            expr,
            pattern,
            ..
        } => Expr::Like {
            expr: Box::new(lower_expr(expr)),
            pattern: Box::new(lower_expr(pattern)),
            negated: *negated,
        },
        E::IsNull(inner) => Expr::IsNull {
            expr: Box::new(lower_expr(inner)),
            negated: false,
        },
        E::IsNotNull(inner) => Expr::IsNull {
            expr: Box::new(lower_expr(inner)),
            negated: true,
        },
        E::Between {
            expr,
            negated,
            low,
            high,
            ..
        } => Expr::Between {
            expr: Box::new(lower_expr(expr)),
            low: Box::new(lower_expr(low)),
            high: Box::new(lower_expr(high)),
            negated: *negated,
        },
        E::InList {
            expr,
            list,
            negated,
        } => Expr::InList {
            expr: Box::new(lower_expr(expr)),
            list: list.iter().map(lower_expr).collect(),
            negated: *negated,
        },
        E::InSubquery {
            expr,
            subquery,
            negated,
        } => Expr::InSubquery {
            expr: Box::new(lower_expr(expr)),
            subquery: Box::new(lower_query(subquery)),
            negated: *negated,
        },
        E::Exists { subquery, negated } => Expr::Exists {
            subquery: Box::new(lower_query(subquery)),
            negated: *negated,
        },
        E::Subquery(query) => Expr::Subquery(Box::new(lower_query(query))),
        E::Case {
            operand,
            conditions,
            results,
            else_result,
            ..
        } => Expr::Case {
            operand: operand.as_ref().map(|e| Box::new(lower_expr(e))),
            branches: conditions
                .iter()
                .zip(results)
                .map(|(condition, result)| (lower_expr(condition), lower_expr(result)))
                .collect(),
            else_result: else_result.as_ref().map(|e| Box::new(lower_expr(e))),
        },
        E::Cast {
            expr, data_type, ..
        } => Expr::Cast {
            expr: Box::new(lower_expr(expr)),
            data_type: data_type.to_string(),
        },
        other => Expr::Raw(other.to_string()),
    }
}

fn lower_function(function: &ast::Function) -> FunctionCall {
    let args = match &function.args {
        ast::FunctionArguments::List(list) => {
            list.args.iter().filter_map(lower_function_arg).collect()
        }
        ast::FunctionArguments::Subquery(query) => {
            vec![Expr::Subquery(Box::new(lower_query(query)))]
        }
        ast::FunctionArguments::None => Vec::new(),
    };

    FunctionCall {
        name: object_name(&function.name),
        args,
        windowed: function.over.is_some(),
    }
}

fn lower_function_arg(arg: &ast::FunctionArg) -> Option<Expr> {
    let arg = match arg {
        ast::FunctionArg::Unnamed(arg) => arg,
        ast::FunctionArg::Named { arg, .. } => arg,
        _ => return None,
    };

    Some(match arg {
        ast::FunctionArgExpr::Expr(expr) => lower_expr(expr),
        ast::FunctionArgExpr::Wildcard | ast::FunctionArgExpr::QualifiedWildcard(_) => {
            Expr::Wildcard
        }
    })
}

fn lower_binary_op(op: &ast::BinaryOperator) -> BinaryOp {
    use ast::BinaryOperator as Op;

    match op {
        Op::And => BinaryOp::And,
        Op::Or => BinaryOp::Or,
        Op::Eq => BinaryOp::Eq,
        Op::NotEq => BinaryOp::NotEq,
        Op::Lt => BinaryOp::Lt,
        Op::LtEq => BinaryOp::LtEq,
        Op::Gt => BinaryOp::Gt,
        Op::GtEq => BinaryOp::GtEq,
        other => BinaryOp::Other(other.to_string()),
    }
}

fn object_name(name: &ast::ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

/// `CREATE TABLE foo (...)` -> `CREATE TABLE`
fn leading_keywords(sql: &str) -> String {
    let mut words = sql.split_whitespace().map(str::to_uppercase);
    let Some(first) = words.next() else {
        return "UNKNOWN".to_string();
    };

    match first.as_str() {
        "CREATE" | "ALTER" | "DROP" => {
            let object = words.find(|w| {
                !matches!(
                    w.as_str(),
                    "OR" | "REPLACE" | "TEMPORARY" | "TEMP" | "UNIQUE"
                )
            });
            match object {
                Some(object) => format!("{first} {object}"),
                None => first,
            }
        }
        _ => first,
    }
}
