//! Tests for report rendering

use super::*;
use crate::analysis::{AnalysisContext, analyze};
use crate::syntax::Vendor;
use pretty_assertions::assert_eq;

fn row(category: &str, item: &str, notes: &str) -> ReportRow {
    ReportRow::new(category, item, notes)
}

fn warning(warning_type: WarningType, message: &str, candidates: &[&str]) -> TableWarning {
    TableWarning {
        table: "orders".to_string(),
        warning_type,
        message: message.to_string(),
        index_candidates: candidates.iter().map(|c| c.to_string()).collect(),
    }
}

fn orders_report() -> TableReport {
    let analysis = analyze(
        "SELECT o.id FROM orders o WHERE YEAR(o.created_at) = 2024 AND o.status = 'x'",
        &AnalysisContext::new(Vendor::MySql),
    );
    let (key, usage) = analysis.table_usages.iter().next().unwrap();
    TableReport::from_usage(key, usage)
}

mod structural_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_parse_error() {
        let analysis = analyze("SELEC 1", &AnalysisContext::new(Vendor::MySql));
        let text = render_structural(&analysis);
        assert!(text.starts_with("--- SQL Parse Error ---\nLine: 1, Col: 1"));
    }

    #[test]
    fn test_render_empty_query() {
        let analysis = analyze("", &AnalysisContext::default());
        assert_eq!(
            render_structural(&analysis),
            "--- Query Structure Analysis ---\n\
             Statement Type: EMPTY\n\
             \n--- Query Statistics ---\n\
             (No specific stats gathered)\n\
             \n--- Performance Hints (Structural) ---\n\
             [INFO] Empty Query\n  \
             Why: The input string contained no SQL statements.\n  \
             Suggestion: Enter a valid SQL query.\n\n"
        );
    }

    #[test]
    fn test_render_statistics() {
        let analysis = analyze("DELETE FROM sessions", &AnalysisContext::new(Vendor::MySql));
        let text = render_structural(&analysis);
        assert!(text.contains("Statement Type: DELETE\n"));
        assert!(text.contains("targetTable: sessions\nhasWhereClause: false\n"));
        assert!(text.contains("[SEVERE] DELETE Without WHERE"));
    }
}

mod table_report_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_usage() {
        let report = orders_report();
        assert_eq!(report.table, "orders");
        assert_eq!(
            report.rows,
            vec![
                row("General", "Alias Used", "o"),
                row("", "", ""),
                row(WARNING_CATEGORY, "Function on WHERE column(s)", "May prevent index usage"),
                row("", "- created_at", "(Function applied)"),
                row("", "", ""),
                row("--- ALL COLUMNS USED ---", "(3 found)", ""),
                row("Column", "id", ""),
                row("Column", "created_at", ""),
                row("Column", "status", ""),
                row("", "", ""),
                row("--- WHERE/JOIN COLUMNS ---", "(2 found)", ""),
                row("Filtering", "created_at", "(Function applied)"),
                row("Filtering", "status", ""),
            ]
        );
    }

    #[test]
    fn test_empty_usage() {
        let report = TableReport::from_usage(&TableKey::Ambiguous, &TableUsage::default());
        assert_eq!(report.table, "?(Ambiguous)");
        assert_eq!(report.rows[0], row("General", "Alias Used", "N/A"));
        assert!(report.rows.contains(&row("", "(None Detected)", "")));
        assert_eq!(report.rows.last(), Some(&row("", "(None)", "")));
    }

    #[test]
    fn test_apply_full_scan() {
        let mut report = orders_report();
        let applied = report.apply_warning(&warning(
            WarningType::FullTableScan,
            "Suggestion: Index JOIN/WHERE columns. Candidates: [created_at, status]",
            &["created_at", "status"],
        ));
        assert!(applied);
        assert_eq!(
            report.rows[..4].to_vec(),
            vec![
                row(
                    WARNING_CATEGORY,
                    "Full Table Scan",
                    "Suggestion: Index JOIN/WHERE columns. Candidates: [created_at, status]"
                ),
                row("", "", ""),
                row("-> Index Suggestion", "Index JOIN/WHERE columns:", "[created_at, status]"),
                row("", "", ""),
            ]
        );
        assert_eq!(report.rows[4], row("General", "Alias Used", "o"));
    }

    #[test]
    fn test_same_warning_on_top_is_skipped() {
        let mut report = orders_report();
        let scan = warning(WarningType::FullTableScan, "scan", &[]);
        assert!(report.apply_warning(&scan));
        let len = report.rows.len();
        assert!(!report.apply_warning(&scan));
        assert_eq!(report.rows.len(), len);
        assert_eq!(
            report.rows[2],
            row("-> Index Suggestion", "Index JOIN columns:", "(Check query for columns used to join)")
        );
    }

    #[test]
    fn test_newest_warning_goes_on_top() {
        let mut report = orders_report();
        report.apply_warning(&warning(WarningType::FullTableScan, "scan", &[]));
        report.apply_warning(&warning(WarningType::HighRowEstimate, "Est. rows: 50000", &[]));
        assert!(report.is_headed_by(WarningType::HighRowEstimate));
        assert_eq!(
            report.rows[2],
            row("-> Info", "Est. rows: 50000", "(Check WHERE/JOIN selectivity)")
        );
        assert_eq!(report.rows[4].item, "Full Table Scan");
    }

    #[test]
    fn test_index_not_used_lines() {
        let mut report = orders_report();
        report.apply_warning(&warning(
            WarningType::IndexNotUsed,
            "Potential reasons:\n- Data type mismatch in JOIN/WHERE\n- Optimizer chose scan",
            &[],
        ));
        assert_eq!(
            report.rows[..6].to_vec(),
            vec![
                row(WARNING_CATEGORY, "Index Not Used", "Potential reasons:"),
                row("", "", ""),
                row("-> Explanation", "Potential reasons:", ""),
                row("", "- Data type mismatch in JOIN/WHERE", ""),
                row("", "- Optimizer chose scan", ""),
                row("", "", ""),
            ]
        );
    }

    #[test]
    fn test_filesort_and_temporary_fallbacks() {
        let mut report = orders_report();
        report.apply_warning(&warning(WarningType::FilesortUsed, "sort", &[]));
        assert_eq!(report.rows[2].notes, "(Columns not identified)");

        report.apply_warning(&warning(WarningType::TemporaryTableUsed, "temp", &[]));
        assert_eq!(
            report.rows[2],
            row("-> Index Suggestion", "Consider indexing GROUP BY columns", "(If applicable)")
        );

        report.apply_warning(&warning(WarningType::FilesortUsed, "sort", &["day"]));
        assert_eq!(report.rows[2].notes, "[day]");
    }

    #[test]
    fn test_apply_warnings_by_simple_name() {
        let mut reports = vec![orders_report()];
        let mut scan = warning(WarningType::FullTableScan, "scan", &[]);
        scan.table = "shop.ORDERS".to_string();
        let missing = TableWarning {
            table: "customers".to_string(),
            ..scan.clone()
        };

        let touched = apply_warnings(&mut reports, &[scan, missing]);
        assert_eq!(touched.into_iter().collect::<Vec<_>>(), vec!["orders".to_string()]);
        assert!(reports[0].is_headed_by(WarningType::FullTableScan));
    }
}
