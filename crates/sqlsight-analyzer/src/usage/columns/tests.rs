//! Tests for column usage extraction

use super::*;
use crate::syntax::{Vendor, parse};
use pretty_assertions::assert_eq;

fn usages(sql: &str) -> TableUsages {
    let statements = parse(sql, Vendor::MySql).unwrap();
    let statement = &statements[0].statement;
    extract(statement, &AliasMap::build(statement))
}

fn columns(set: &IndexSet<String>) -> Vec<&str> {
    set.iter().map(String::as_str).collect()
}

fn known<'a>(usages: &'a TableUsages, table: &str) -> &'a TableUsage {
    usages
        .get(&TableKey::known(table))
        .unwrap_or_else(|| panic!("no usage for {table}"))
}

mod table_key_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        assert_eq!(TableKey::known("orders").to_string(), "orders");
        assert_eq!(
            TableKey::UnresolvedQualifier("x".to_string()).to_string(),
            "?(x)"
        );
        assert_eq!(TableKey::Ambiguous.to_string(), "?(Ambiguous)");
    }

    #[test]
    fn test_round_trips_through_string() {
        for key in [
            TableKey::known("orders"),
            TableKey::UnresolvedQualifier("zz".to_string()),
            TableKey::Ambiguous,
        ] {
            assert_eq!(TableKey::from(String::from(key.clone())), key);
        }
    }

    #[test]
    fn test_placeholder_never_collides_with_table() {
        assert_ne!(TableKey::known("Ambiguous"), TableKey::Ambiguous);
        assert!(!TableKey::Ambiguous.is_known());
        assert_eq!(TableKey::known("t").known_name(), Some("t"));
    }

    #[test]
    fn test_usages_serialize_with_string_keys() {
        let mut usages = TableUsages::new();
        usages.entry(TableKey::Ambiguous).record_where("id", false);
        let json = serde_json::to_value(&usages).unwrap();
        assert_eq!(json["?(Ambiguous)"]["where_columns"][0], "id");
    }
}

mod resolution_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_function_in_where() {
        let usages = usages("SELECT * FROM orders o WHERE YEAR(o.created_at) = 2024");
        let orders = known(&usages, "orders");
        assert_eq!(orders.alias_used.as_deref(), Some("o"));
        assert_eq!(columns(&orders.where_columns), vec!["created_at"]);
        assert_eq!(columns(&orders.function_where_columns), vec!["created_at"]);
        assert_eq!(columns(&orders.all_columns), vec!["*", "created_at"]);
        assert_eq!(usages.len(), 1);
    }

    #[test]
    fn test_single_table_takes_unqualified_columns() {
        let usages = usages("SELECT id FROM users WHERE status = 'x' AND LOWER(email) = 'a'");
        let users = known(&usages, "users");
        assert_eq!(columns(&users.where_columns), vec!["status", "email"]);
        assert_eq!(columns(&users.function_where_columns), vec!["email"]);
        assert_eq!(columns(&users.all_columns), vec!["id", "status", "email"]);
    }

    #[test]
    fn test_unqualified_with_several_tables_is_ambiguous() {
        let usages = usages("SELECT a.id FROM a JOIN b ON b.a_id = a.id WHERE flag = 1");
        let ambiguous = usages.get(&TableKey::Ambiguous).unwrap();
        assert_eq!(columns(&ambiguous.where_columns), vec!["flag"]);
        assert_eq!(columns(&known(&usages, "b").all_columns), vec!["a_id"]);
    }

    #[test]
    fn test_unknown_qualifier() {
        let usages = usages("SELECT zz.id FROM orders o");
        let unresolved = usages
            .get(&TableKey::UnresolvedQualifier("zz".to_string()))
            .unwrap();
        assert_eq!(columns(&unresolved.all_columns), vec!["id"]);
        assert!(known(&usages, "orders").all_columns.is_empty());
    }

    #[test]
    fn test_canonical_name_as_qualifier() {
        let usages = usages("SELECT orders.id FROM orders o");
        assert_eq!(columns(&known(&usages, "orders").all_columns), vec!["id"]);
    }

    #[test]
    fn test_subquery_scope_is_innermost() {
        let usages = usages(
            "SELECT u.name FROM users u \
             WHERE u.id IN (SELECT user_id FROM orders WHERE total > 100)",
        );
        let orders = known(&usages, "orders");
        assert_eq!(columns(&orders.where_columns), vec!["user_id", "total"]);
        let users = known(&usages, "users");
        assert_eq!(columns(&users.where_columns), vec!["id"]);
        assert!(usages.get(&TableKey::Ambiguous).is_none());
    }

    #[test]
    fn test_correlated_reference_reaches_outer_scope() {
        let usages = usages(
            "SELECT c.id FROM customers c \
             WHERE EXISTS (SELECT 1 FROM orders o WHERE o.customer_id = c.id)",
        );
        assert_eq!(columns(&known(&usages, "customers").where_columns), vec!["id"]);
        assert_eq!(
            columns(&known(&usages, "orders").where_columns),
            vec!["customer_id"]
        );
    }
}

mod clause_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_group_and_order_columns() {
        let usages = usages(
            "SELECT s.region, SUM(s.amount) FROM sales s \
             GROUP BY s.region ORDER BY s.region, s.day",
        );
        let sales = known(&usages, "sales");
        assert_eq!(columns(&sales.group_by_columns), vec!["region"]);
        assert_eq!(columns(&sales.order_by_columns), vec!["region", "day"]);
        assert!(sales.where_columns.is_empty());
    }

    #[test]
    fn test_join_columns_are_not_where_columns() {
        let usages = usages("SELECT 1 FROM a JOIN b ON b.a_id = a.id WHERE a.x = 1");
        assert_eq!(columns(&known(&usages, "a").where_columns), vec!["x"]);
        assert!(known(&usages, "b").where_columns.is_empty());
    }

    #[test]
    fn test_qualified_wildcard_marker() {
        let usages = usages("SELECT o.*, c.name FROM orders o JOIN customers c ON c.id = o.cid");
        assert_eq!(
            columns(&known(&usages, "orders").all_columns),
            vec!["*(o.*)", "cid"]
        );
    }

    #[test]
    fn test_bare_wildcard_marks_every_table_in_block() {
        let usages = usages("SELECT * FROM orders o JOIN customers c ON c.id = o.cid");
        assert!(known(&usages, "orders").all_columns.contains("*"));
        assert!(known(&usages, "customers").all_columns.contains("*"));
    }

    #[test]
    fn test_update_targets_and_where() {
        let usages = usages("UPDATE users SET name = 'x' WHERE LOWER(email) = 'a'");
        let users = known(&usages, "users");
        assert_eq!(columns(&users.all_columns), vec!["name", "email"]);
        assert_eq!(columns(&users.function_where_columns), vec!["email"]);
    }

    #[test]
    fn test_insert_columns() {
        let usages = usages("INSERT INTO tags (id, label) VALUES (1, 'a')");
        assert_eq!(columns(&known(&usages, "tags").all_columns), vec!["id", "label"]);
    }

    #[test]
    fn test_function_columns_are_where_columns() {
        let usages = usages(
            "SELECT 1 FROM a JOIN b ON a.id = b.id \
             WHERE UPPER(a.x) = 'A' OR COALESCE(b.y, TRIM(b.z)) = '' OR zz.w = 1",
        );
        for (_, usage) in usages.iter() {
            for column in &usage.function_where_columns {
                assert!(usage.where_contains(column));
            }
        }
        assert_eq!(usages.total_function_where_columns(), 3);
        assert_eq!(usages.total_where_columns(), 4);
    }
}

mod usage_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_case_insensitive_lookups() {
        let mut usage = TableUsage::default();
        usage.record_where("Status", true);
        usage.record_where("id", false);
        assert!(usage.where_contains("STATUS"));
        assert!(usage.function_where_contains("status"));
        assert!(!usage.function_where_contains("id"));
        assert_eq!(usage.functions_on_where_columns(), vec!["Status"]);
    }

    #[test]
    fn test_get_known_ignores_case() {
        let mut usages = TableUsages::new();
        usages.entry(TableKey::known("Orders"));
        assert!(usages.get_known("orders").is_some());
        assert!(usages.get_known("customers").is_none());
    }
}
