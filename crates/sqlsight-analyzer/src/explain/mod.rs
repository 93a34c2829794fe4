//! EXPLAIN Plan Correlation
//!
//! This module maps the rows a database returns for `EXPLAIN <statement>` back onto
//! the structural analysis of the same statement:
//! - [`row`]: one EXPLAIN row with case-insensitive column access
//! - [`tabular`]: parsing captured EXPLAIN output (JSON or client table text)
//! - [`correlate`]: table-scoped warnings, tab highlights and a narrative
//!
//! # Example
//!
//! ```
//! use sqlsight_analyzer::explain::{WarningType, correlate, parse_explain_output};
//! use sqlsight_analyzer::usage::{AliasMap, TableKey, TableUsages};
//!
//! let rows = parse_explain_output(
//!     r#"[{"id": 1, "table": "o", "type": "ALL", "possible_keys": null, "rows": 50000, "Extra": ""}]"#,
//! )
//! .unwrap();
//!
//! let mut aliases = AliasMap::new();
//! aliases.insert("o", "orders");
//! let mut usages = TableUsages::new();
//! usages.entry(TableKey::known("orders")).record_where("status", false);
//!
//! let correlation = correlate(&rows, &aliases, &usages, 10_000);
//! assert_eq!(correlation.warnings[0].warning_type, WarningType::FullTableScan);
//! assert_eq!(correlation.warnings[1].warning_type, WarningType::HighRowEstimate);
//! ```

pub mod correlate;
pub mod row;
pub mod tabular;

pub use correlate::{
    Correlation, HighlightLevel, INFORMATIONAL_ROW_ESTIMATE, TableWarning, WarningLedger,
    WarningType, correlate, correlate_with,
};
pub use row::ExplainRow;
pub use tabular::{ExplainParseError, parse_explain_output};
