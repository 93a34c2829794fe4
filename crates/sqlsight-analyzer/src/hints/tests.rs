//! Tests for the hint engine

use super::*;
use crate::stats;
use crate::syntax::{Vendor, parse};
use crate::usage::{AliasMap, extract};
use pretty_assertions::assert_eq;

fn hints_with(sql: &str, config: &AnalyzerConfig) -> Vec<PerformanceHint> {
    let statements = parse(sql, Vendor::MySql).unwrap();
    let statement = &statements[0].statement;
    let usages = extract(statement, &AliasMap::build(statement));
    let mut statistics = stats::collect(statement);
    stats::attach_usage_totals(&mut statistics, &usages);
    generate(statement, &usages, &statistics, config)
}

fn hints_for(sql: &str) -> Vec<PerformanceHint> {
    hints_with(sql, &AnalyzerConfig::default())
}

fn titles(hints: &[PerformanceHint]) -> Vec<&str> {
    hints.iter().map(|h| h.title.as_str()).collect()
}

fn find<'a>(hints: &'a [PerformanceHint], title: &str) -> &'a PerformanceHint {
    hints
        .iter()
        .find(|h| h.title == title)
        .unwrap_or_else(|| panic!("no hint titled {title}: {:?}", titles(hints)))
}

mod select_rule_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_select_star_and_function_on_where() {
        let hints = hints_for("SELECT * FROM orders o WHERE YEAR(o.created_at) = 2024");
        assert_eq!(
            titles(&hints),
            vec!["Avoid SELECT *", "Function on WHERE Column(s)"]
        );
        assert_eq!(hints[0].severity, Severity::Warn);

        let function = &hints[1];
        assert_eq!(function.severity, Severity::Severe);
        assert!(
            function
                .suggestion
                .ends_with("Columns involved: [created_at] in table 'orders'.")
        );
    }

    #[test]
    fn test_one_function_hint_per_table() {
        let hints = hints_for(
            "SELECT a.id FROM a JOIN b ON a.id = b.a_id \
             WHERE UPPER(a.name) = 'X' AND LOWER(b.code) = 'y' AND TRIM(a.tag) = ''",
        );
        let function_hints: Vec<_> = hints
            .iter()
            .filter(|h| h.title == "Function on WHERE Column(s)")
            .collect();
        assert_eq!(function_hints.len(), 2);
        assert!(function_hints[0].suggestion.contains("[name, tag] in table 'a'"));
        assert!(function_hints[1].suggestion.contains("[code] in table 'b'"));
    }

    #[test]
    fn test_cartesian_product() {
        let hints = hints_for("SELECT a.id FROM a, b");
        let hint = find(&hints, "Potential Cartesian Product");
        assert_eq!(hint.severity, Severity::Severe);
        assert!(hint.explanation.contains("multiple tables (2)"));
        assert!(!titles(&hints).contains(&"Potential Full Table Scan (No WHERE)"));
    }

    #[test]
    fn test_full_table_scan() {
        let hints = hints_for("SELECT id FROM users");
        assert_eq!(titles(&hints), vec!["Potential Full Table Scan (No WHERE)"]);
        assert_eq!(hints[0].severity, Severity::Warn);
    }

    #[test]
    fn test_no_tables_means_no_scan_hint() {
        let hints = hints_for("SELECT 1");
        assert_eq!(titles(&hints), vec!["No Obvious Structural Issues"]);
    }

    #[test]
    fn test_expressions_in_order_and_group_by() {
        let hints = hints_for(
            "SELECT YEAR(created_at), COUNT(*) FROM orders WHERE id > 0 \
             GROUP BY YEAR(created_at), status ORDER BY COUNT(*) DESC, id",
        );
        assert_eq!(
            titles(&hints),
            vec!["Expression in ORDER BY", "Expression in GROUP BY"]
        );
        assert!(hints[0].explanation.contains("('COUNT(*)')"));
        assert!(hints[1].explanation.contains("('YEAR(created_at)')"));
        assert_eq!(hints[1].severity, Severity::Info);
    }

    #[test]
    fn test_leading_wildcard() {
        let hints = hints_for("SELECT a.id FROM t a WHERE a.name LIKE '%smith'");
        let hint = find(&hints, "LIKE with Leading Wildcard");
        assert_eq!(hint.severity, Severity::Warn);
        assert!(hint.explanation.contains("on column(s): [name]"));
    }

    #[test]
    fn test_trailing_wildcard_is_fine() {
        let hints = hints_for("SELECT a.id FROM t a WHERE a.name LIKE 'smith%'");
        assert!(!titles(&hints).contains(&"LIKE with Leading Wildcard"));
    }

    #[test]
    fn test_or_on_different_columns() {
        let hints = hints_for("SELECT * FROM a WHERE a.x = 1 OR a.y = 2");
        assert_eq!(
            find(&hints, "OR Condition on Different Columns").severity,
            Severity::Info
        );
    }

    #[test]
    fn test_or_on_same_column() {
        let hints = hints_for("SELECT id FROM a WHERE a.x = 1 OR a.x = 2");
        assert_eq!(titles(&hints), vec!["No Obvious Structural Issues"]);
    }

    #[test]
    fn test_distinct() {
        let hints = hints_for("SELECT DISTINCT status FROM orders WHERE total > 5");
        assert_eq!(titles(&hints), vec!["SELECT DISTINCT Usage"]);
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let hints = hints_for(
            "SELECT DISTINCT * FROM orders o \
             WHERE UPPER(o.name) = 'X' AND o.code LIKE '%x' OR o.id = 1 \
             ORDER BY LOWER(o.name)",
        );
        assert_eq!(
            titles(&hints),
            vec![
                "Avoid SELECT *",
                "Function on WHERE Column(s)",
                "Expression in ORDER BY",
                "LIKE with Leading Wildcard",
                "OR Condition on Different Columns",
                "SELECT DISTINCT Usage",
            ]
        );
    }
}

mod or_detection_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selection(sql: &str) -> Expr {
        let statements = parse(sql, Vendor::MySql).unwrap();
        statements[0]
            .statement
            .as_select()
            .and_then(|select| select.selection.clone())
            .unwrap()
    }

    #[test]
    fn test_nested_or_is_found() {
        let expr = selection("SELECT 1 FROM t WHERE t.a = 1 AND (t.b = 2 OR t.c = 3)");
        assert!(has_or_on_different_columns(&expr));
    }

    #[test]
    fn test_subset_columns_still_differ() {
        let expr = selection("SELECT 1 FROM t WHERE t.a = 1 OR (t.a = 2 AND t.b = 3)");
        assert!(has_or_on_different_columns(&expr));
    }

    #[test]
    fn test_function_arguments_are_not_base_columns() {
        let expr = selection("SELECT 1 FROM t WHERE t.a = 1 OR UPPER(t.b) = 'X'");
        assert!(!has_or_on_different_columns(&expr));
    }

    #[test]
    fn test_subquery_or_is_ignored() {
        let expr = selection(
            "SELECT 1 FROM t WHERE t.a IN (SELECT u.a FROM u WHERE u.x = 1 OR u.y = 2)",
        );
        assert!(!has_or_on_different_columns(&expr));
    }

    #[test]
    fn test_case_insensitive_columns() {
        let expr = selection("SELECT 1 FROM t WHERE t.A = 1 OR t.a = 2");
        assert!(!has_or_on_different_columns(&expr));
    }

    #[test]
    fn test_leading_wildcard_quotes() {
        assert_eq!(unquote("'%abc'"), "%abc");
        assert_eq!(unquote("\"%abc\""), "%abc");
        assert_eq!(unquote("'"), "'");
        assert_eq!(unquote(" plain "), "plain");
    }
}

mod dml_rule_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_without_where() {
        let hints = hints_for("UPDATE users SET active = 0");
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].severity, Severity::Severe);
        assert_eq!(hints[0].title, "UPDATE Without WHERE");
        assert_eq!(
            hints[0].explanation,
            "This statement will update *all* rows in the table 'users'."
        );
    }

    #[test]
    fn test_delete_without_where() {
        let hints = hints_for("DELETE FROM sessions");
        assert_eq!(titles(&hints), vec!["DELETE Without WHERE"]);
        assert!(hints[0].explanation.contains("'sessions'"));
    }

    #[test]
    fn test_update_with_function_in_where() {
        let hints = hints_for("UPDATE users SET active = 0 WHERE LOWER(email) = 'a@b.c'");
        assert_eq!(titles(&hints), vec!["Function on WHERE Column(s)"]);
        assert_eq!(hints[0].severity, Severity::Warn);
        assert!(hints[0].explanation.contains("[email]"));
    }

    #[test]
    fn test_clean_delete_gets_placeholder() {
        let hints = hints_for("DELETE FROM sessions WHERE id = 4");
        assert_eq!(titles(&hints), vec!["Basic Analysis Complete"]);
        assert_eq!(
            hints[0].suggestion,
            "Review database-specific guidelines for DELETE."
        );
    }

    #[test]
    fn test_insert_select() {
        let hints = hints_for("INSERT INTO archive SELECT * FROM orders");
        assert_eq!(titles(&hints), vec!["INSERT...SELECT"]);
    }

    #[test]
    fn test_large_values_list() {
        let rows = vec!["(1)"; 51].join(", ");
        let hints = hints_for(&format!("INSERT INTO t (id) VALUES {rows}"));
        assert_eq!(titles(&hints), vec!["Large VALUES List"]);
        assert!(hints[0].explanation.contains("(51)"));

        let rows = vec!["(1)"; 50].join(", ");
        let hints = hints_for(&format!("INSERT INTO t (id) VALUES {rows}"));
        assert_eq!(titles(&hints), vec!["Basic Analysis Complete"]);
    }

    #[test]
    fn test_values_threshold_is_configurable() {
        let config = AnalyzerConfig::default().with_large_values_threshold(2);
        let hints = hints_with("INSERT INTO t (id) VALUES (1), (2), (3)", &config);
        assert_eq!(titles(&hints), vec!["Large VALUES List"]);
    }

    #[test]
    fn test_ddl_placeholder() {
        let hints = hints_for("CREATE TABLE t (id INT)");
        assert_eq!(titles(&hints), vec!["DDL/Custom Statement"]);
        assert_eq!(hints[0].explanation, "Statement type: CREATE TABLE");
    }
}

mod hint_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        let hint = PerformanceHint::new(Severity::Severe, "Title", "Because.", "Do this.");
        assert_eq!(
            hint.to_string(),
            "[SEVERE] Title\n  Why: Because.\n  Suggestion: Do this."
        );
    }

    #[test]
    fn test_empty_query_hint() {
        let hint = empty_query_hint();
        assert_eq!(hint.severity, Severity::Info);
        assert_eq!(hint.title, "Empty Query");
    }

    #[test]
    fn test_severity_order() {
        let mut severities = vec![Severity::Warn, Severity::Severe, Severity::Info];
        severities.sort();
        assert_eq!(severities, vec![Severity::Info, Severity::Warn, Severity::Severe]);
    }
}
