//! Tests for the statement traversal

use super::*;
use crate::syntax::{Vendor, parse};
use pretty_assertions::assert_eq;

/// Records every column reference with the context it was reached in
#[derive(Default)]
struct ColumnRecorder {
    columns: Vec<(String, TraversalContext)>,
    depth: i32,
    max_depth: i32,
}

impl Visitor for ColumnRecorder {
    fn enter(&mut self, node: Node<'_>, ctx: &TraversalContext) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        if let Node::ColumnRef(column) = node {
            self.columns.push((column.name.clone(), *ctx));
        }
    }

    fn exit(&mut self, _node: Node<'_>, _ctx: &TraversalContext) {
        self.depth -= 1;
    }
}

fn record(sql: &str) -> ColumnRecorder {
    let statements = parse(sql, Vendor::MySql).unwrap();
    let mut recorder = ColumnRecorder::default();
    walk_statement(&statements[0].statement, &mut recorder);
    recorder
}

fn context_of<'a>(recorder: &'a ColumnRecorder, name: &str) -> &'a TraversalContext {
    recorder
        .columns
        .iter()
        .find(|(column, _)| column == name)
        .map(|(_, ctx)| ctx)
        .unwrap_or_else(|| panic!("column {name} not visited"))
}

mod context_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_empty() {
        let ctx = TraversalContext::default();
        assert!(!ctx.in_where);
        assert!(!ctx.in_function());
        assert!(!ctx.in_group_by);
        assert!(!ctx.in_order_by);
        assert_eq!(ctx.subquery_depth, 0);
    }

    #[test]
    fn test_builders_do_not_mutate_original() {
        let base = TraversalContext::default();
        let nested = base.enter_where().enter_function().enter_function();
        assert!(nested.in_where);
        assert_eq!(nested.function_depth, 2);
        assert_eq!(base, TraversalContext::default());
    }
}

mod walk_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_where_and_function_state() {
        let recorder = record("SELECT id FROM orders WHERE YEAR(created_at) = 2024 AND status = 'x'");

        let id = context_of(&recorder, "id");
        assert!(!id.in_where);

        let created = context_of(&recorder, "created_at");
        assert!(created.in_where);
        assert!(created.in_function());

        let status = context_of(&recorder, "status");
        assert!(status.in_where);
        assert!(!status.in_function());
    }

    #[test]
    fn test_nested_functions_count_as_wrapped() {
        let recorder = record("SELECT id FROM t WHERE LOWER(TRIM(name)) = 'a'");
        let name = context_of(&recorder, "name");
        assert_eq!(name.function_depth, 2);
        assert!(name.in_function());
    }

    #[test]
    fn test_group_and_order_state() {
        let recorder = record("SELECT region FROM sales GROUP BY region_id ORDER BY total");

        let grouped = context_of(&recorder, "region_id");
        assert!(grouped.in_group_by);
        assert!(!grouped.in_order_by);

        let ordered = context_of(&recorder, "total");
        assert!(ordered.in_order_by);
        assert!(!ordered.in_group_by);

        assert!(!context_of(&recorder, "region").in_group_by);
    }

    #[test]
    fn test_subquery_inherits_where() {
        let recorder =
            record("SELECT id FROM users WHERE id IN (SELECT user_id FROM orders WHERE paid = 1)");

        let user_id = context_of(&recorder, "user_id");
        assert_eq!(user_id.subquery_depth, 1);
        assert!(user_id.in_where);

        let paid = context_of(&recorder, "paid");
        assert_eq!(paid.subquery_depth, 1);
        assert!(paid.in_where);
    }

    #[test]
    fn test_join_condition_is_not_where() {
        let recorder = record("SELECT a.x FROM a JOIN b ON b.a_id = a.id");
        assert!(!context_of(&recorder, "a_id").in_where);
    }

    #[test]
    fn test_enter_and_exit_are_balanced() {
        let recorder = record(
            "SELECT COUNT(*), CASE WHEN x > 1 THEN y ELSE z END FROM t \
             WHERE x BETWEEN 1 AND 5 OR y IS NULL GROUP BY y ORDER BY 1",
        );
        assert_eq!(recorder.depth, 0);
        assert!(recorder.max_depth > 3);
    }

    #[test]
    fn test_update_where_columns() {
        let recorder = record("UPDATE users SET name = UPPER(name) WHERE LOWER(email) = 'a'");
        let email = context_of(&recorder, "email");
        assert!(email.in_where);
        assert!(email.in_function());
    }
}
