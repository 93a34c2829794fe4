//! Statement Traversal
//!
//! One recursive walk over the statement model shared by every analysis pass.
//! Clause state (inside WHERE, inside a function call, inside GROUP BY / ORDER BY,
//! subquery depth) is carried in a [`TraversalContext`] value that is copied and
//! narrowed on the way down, so nothing has to be reset on the way back up.
//!
//! Each node is reported to the [`Visitor`] twice: `enter` before its children
//! and `exit` after them, both with the context the node itself was reached in.

use super::{
    Assignment, BinaryOp, ClauseItem, ColumnRef, Expr, FunctionCall, InsertSource, Join,
    ResultColumn, SelectStatement, Statement, TableRef,
};

/// Clause state at a point of the traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalContext {
    pub in_where: bool,
    /// Number of enclosing function calls
    pub function_depth: u32,
    pub in_group_by: bool,
    pub in_order_by: bool,
    /// Number of enclosing nested query blocks
    pub subquery_depth: u32,
}

impl TraversalContext {
    pub fn in_function(&self) -> bool {
        self.function_depth > 0
    }

    pub fn enter_where(self) -> Self {
        Self {
            in_where: true,
            ..self
        }
    }

    pub fn enter_function(self) -> Self {
        Self {
            function_depth: self.function_depth + 1,
            ..self
        }
    }

    pub fn enter_group_by(self) -> Self {
        Self {
            in_group_by: true,
            ..self
        }
    }

    pub fn enter_order_by(self) -> Self {
        Self {
            in_order_by: true,
            ..self
        }
    }

    pub fn enter_subquery(self) -> Self {
        Self {
            subquery_depth: self.subquery_depth + 1,
            ..self
        }
    }
}

/// A node reported to a [`Visitor`]
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Statement(&'a Statement),
    /// A query block: the root SELECT, a set-operation branch, a CTE or a subquery body
    Select(&'a SelectStatement),
    TableRef(&'a TableRef),
    Join(&'a Join),
    ResultColumn(&'a ResultColumn),
    Assignment(&'a Assignment),
    WhereClause(&'a Expr),
    GroupBy(&'a [ClauseItem]),
    OrderBy(&'a [ClauseItem]),
    /// Every expression node, reported before its more specific node
    Expression(&'a Expr),
    ColumnRef(&'a ColumnRef),
    FunctionCall(&'a FunctionCall),
    BinaryOp(&'a BinaryOp),
    Constant(&'a str),
    /// A nested query block; its body follows as a [`Node::Select`]
    Subquery(&'a SelectStatement),
}

/// Hooks invoked by the walk
pub trait Visitor {
    fn enter(&mut self, _node: Node<'_>, _ctx: &TraversalContext) {}

    fn exit(&mut self, _node: Node<'_>, _ctx: &TraversalContext) {}
}

/// Walks a whole statement from an empty context
pub fn walk_statement<V: Visitor + ?Sized>(statement: &Statement, visitor: &mut V) {
    let ctx = TraversalContext::default();
    let node = Node::Statement(statement);
    visitor.enter(node, &ctx);

    match statement {
        Statement::Select(select) => walk_select(select, ctx, visitor),
        Statement::Insert(insert) => {
            if let InsertSource::Select(source) = &insert.source {
                walk_subquery(source, ctx, visitor);
            }
        }
        Statement::Update(update) => {
            walk_table(&update.table, ctx, visitor);
            for table in &update.from {
                walk_table(table, ctx, visitor);
            }
            for assignment in &update.assignments {
                visitor.enter(Node::Assignment(assignment), &ctx);
                walk_expr(&assignment.value, ctx, visitor);
                visitor.exit(Node::Assignment(assignment), &ctx);
            }
            if let Some(selection) = &update.selection {
                walk_where(selection, ctx, visitor);
            }
        }
        Statement::Delete(delete) => {
            walk_table(&delete.table, ctx, visitor);
            for table in &delete.from {
                walk_table(table, ctx, visitor);
            }
            if let Some(selection) = &delete.selection {
                walk_where(selection, ctx, visitor);
            }
        }
        Statement::Other(_) => {}
    }

    visitor.exit(node, &ctx);
}

/// Walks one query block and everything nested in it
pub fn walk_select<V: Visitor + ?Sized>(
    select: &SelectStatement,
    ctx: TraversalContext,
    visitor: &mut V,
) {
    let node = Node::Select(select);
    visitor.enter(node, &ctx);

    for cte in &select.ctes {
        walk_subquery(&cte.query, ctx, visitor);
    }

    for column in &select.projection {
        visitor.enter(Node::ResultColumn(column), &ctx);
        if let ResultColumn::Expr { expr, .. } = column {
            walk_expr(expr, ctx, visitor);
        }
        visitor.exit(Node::ResultColumn(column), &ctx);
    }

    for table in &select.tables {
        walk_table(table, ctx, visitor);
    }

    for join in &select.joins {
        visitor.enter(Node::Join(join), &ctx);
        if let Some(condition) = &join.condition {
            walk_expr(condition, ctx, visitor);
        }
        visitor.exit(Node::Join(join), &ctx);
    }

    if let Some(selection) = &select.selection {
        walk_where(selection, ctx, visitor);
    }

    if !select.group_by.is_empty() {
        let group_ctx = ctx.enter_group_by();
        let node = Node::GroupBy(&select.group_by);
        visitor.enter(node, &group_ctx);
        for item in &select.group_by {
            walk_expr(&item.expr, group_ctx, visitor);
        }
        visitor.exit(node, &group_ctx);
    }

    if let Some(having) = &select.having {
        walk_expr(having, ctx, visitor);
    }

    if !select.order_by.is_empty() {
        let order_ctx = ctx.enter_order_by();
        let node = Node::OrderBy(&select.order_by);
        visitor.enter(node, &order_ctx);
        for item in &select.order_by {
            walk_expr(&item.expr, order_ctx, visitor);
        }
        visitor.exit(node, &order_ctx);
    }

    for branch in &select.set_branches {
        walk_select(branch, ctx, visitor);
    }

    visitor.exit(node, &ctx);
}

/// Walks an expression tree
pub fn walk_expr<V: Visitor + ?Sized>(expr: &Expr, ctx: TraversalContext, visitor: &mut V) {
    visitor.enter(Node::Expression(expr), &ctx);

    match expr {
        Expr::Column(column) => {
            visitor.enter(Node::ColumnRef(column), &ctx);
            visitor.exit(Node::ColumnRef(column), &ctx);
        }
        Expr::Literal(text) => {
            visitor.enter(Node::Constant(text), &ctx);
            visitor.exit(Node::Constant(text), &ctx);
        }
        Expr::Function(function) => {
            visitor.enter(Node::FunctionCall(function), &ctx);
            let inner = ctx.enter_function();
            for arg in &function.args {
                walk_expr(arg, inner, visitor);
            }
            visitor.exit(Node::FunctionCall(function), &ctx);
        }
        Expr::Binary { op, left, right } => {
            visitor.enter(Node::BinaryOp(op), &ctx);
            walk_expr(left, ctx, visitor);
            walk_expr(right, ctx, visitor);
            visitor.exit(Node::BinaryOp(op), &ctx);
        }
        Expr::Unary { expr, .. } | Expr::Nested(expr) | Expr::IsNull { expr, .. } => {
            walk_expr(expr, ctx, visitor);
        }
        Expr::Cast { expr, .. } => walk_expr(expr, ctx, visitor),
        Expr::Like { expr, pattern, .. } => {
            walk_expr(expr, ctx, visitor);
            walk_expr(pattern, ctx, visitor);
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            walk_expr(expr, ctx, visitor);
            walk_expr(low, ctx, visitor);
            walk_expr(high, ctx, visitor);
        }
        Expr::InList { expr, list, .. } => {
            walk_expr(expr, ctx, visitor);
            for item in list {
                walk_expr(item, ctx, visitor);
            }
        }
        Expr::InSubquery { expr, subquery, .. } => {
            walk_expr(expr, ctx, visitor);
            walk_subquery(subquery, ctx, visitor);
        }
        Expr::Exists { subquery, .. } | Expr::Subquery(subquery) => {
            walk_subquery(subquery, ctx, visitor);
        }
        Expr::Case {
            operand,
            branches,
            else_result,
        } => {
            if let Some(operand) = operand {
                walk_expr(operand, ctx, visitor);
            }
            for (condition, result) in branches {
                walk_expr(condition, ctx, visitor);
                walk_expr(result, ctx, visitor);
            }
            if let Some(else_result) = else_result {
                walk_expr(else_result, ctx, visitor);
            }
        }
        Expr::Wildcard | Expr::Raw(_) => {}
    }

    visitor.exit(Node::Expression(expr), &ctx);
}

fn walk_where<V: Visitor + ?Sized>(selection: &Expr, ctx: TraversalContext, visitor: &mut V) {
    let where_ctx = ctx.enter_where();
    visitor.enter(Node::WhereClause(selection), &where_ctx);
    walk_expr(selection, where_ctx, visitor);
    visitor.exit(Node::WhereClause(selection), &where_ctx);
}

fn walk_table<V: Visitor + ?Sized>(table: &TableRef, ctx: TraversalContext, visitor: &mut V) {
    visitor.enter(Node::TableRef(table), &ctx);
    if let Some(subquery) = &table.subquery {
        walk_subquery(subquery, ctx, visitor);
    }
    visitor.exit(Node::TableRef(table), &ctx);
}

fn walk_subquery<V: Visitor + ?Sized>(
    subquery: &SelectStatement,
    ctx: TraversalContext,
    visitor: &mut V,
) {
    let nested = ctx.enter_subquery();
    visitor.enter(Node::Subquery(subquery), &nested);
    walk_select(subquery, nested, visitor);
    visitor.exit(Node::Subquery(subquery), &nested);
}

#[cfg(test)]
mod tests;
