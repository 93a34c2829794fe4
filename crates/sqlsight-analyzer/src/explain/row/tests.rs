//! Tests for EXPLAIN rows

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

mod lookup_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_columns_ignore_case() {
        let row = ExplainRow::new().with("EXTRA", "Using filesort").with("Table", "o");
        assert_eq!(row.extra().as_deref(), Some("Using filesort"));
        assert_eq!(row.table().as_deref(), Some("o"));
        assert!(row.access_type().is_none());
    }

    #[test]
    fn test_null_and_blank_keys_are_absent() {
        let row = ExplainRow::new()
            .with("possible_keys", "NULL")
            .with("key", Value::Null);
        assert!(row.possible_keys().is_none());
        assert!(row.key().is_none());

        let row = ExplainRow::new().with("possible_keys", "idx_status");
        assert_eq!(row.possible_keys().as_deref(), Some("idx_status"));
    }

    #[test]
    fn test_numbers_render_as_text() {
        let row = ExplainRow::new().with("id", 1);
        assert_eq!(row.text("id").as_deref(), Some("1"));
    }
}

mod estimate_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_row_estimates() {
        assert_eq!(ExplainRow::new().with("rows", 50_000).row_estimate(), 50_000);
        assert_eq!(ExplainRow::new().with("rows", "1234").row_estimate(), 1234);
        assert_eq!(ExplainRow::new().with("rows", "99.7").row_estimate(), 99);
        assert_eq!(ExplainRow::new().with("rows", json!(12.5)).row_estimate(), 12);
        assert_eq!(ExplainRow::new().with("rows", "many").row_estimate(), 0);
        assert_eq!(ExplainRow::new().row_estimate(), 0);
    }

    #[test]
    fn test_row_id() {
        let row = ExplainRow::new().with("id", 3).with("table", "o");
        assert_eq!(row.row_id(0), "3");

        let row = ExplainRow::new().with("id", Value::Null).with("table", "o");
        assert_eq!(row.row_id(1), "Row 2");
        assert_eq!(ExplainRow::new().row_id(0), "Row 1");
    }

    #[test]
    fn test_row_id_prefers_id_column() {
        let row = ExplainRow::new().with("Extra", "Using where").with("id", 2);
        assert_eq!(row.row_id(0), "2");

        let row = ExplainRow::new().with("step", "scan").with("table", "o");
        assert_eq!(row.row_id(0), "scan");
    }
}
