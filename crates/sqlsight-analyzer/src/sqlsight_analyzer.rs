//! sqlsight Analyzer - structural SQL analysis and EXPLAIN plan correlation
//!
//! This crate provides functionality for:
//! - Parsing SQL for several vendors into a closed statement model
//! - Resolving table aliases and attributing column usage to tables
//! - Collecting structural statistics and heuristic performance hints
//! - Correlating EXPLAIN rows with the structural analysis
//!
//! # Example
//!
//! ```
//! use sqlsight_analyzer::{AnalysisContext, Severity, Vendor, analyze};
//!
//! let analysis = analyze(
//!     "SELECT * FROM orders o WHERE YEAR(o.created_at) = 2024",
//!     &AnalysisContext::new(Vendor::MySql),
//! );
//! assert!(analysis.is_valid);
//! assert_eq!(analysis.hints[1].title, "Function on WHERE Column(s)");
//! assert_eq!(analysis.hints[1].severity, Severity::Severe);
//! ```

pub mod analysis;
pub mod config;
pub mod explain;
pub mod hints;
pub mod report;
pub mod stats;
pub mod syntax;
pub mod usage;

pub use analysis::{
    AnalysisContext, DbError, ExplainReport, ExplainRunner, ExplainStep, ExplainTarget,
    NoProgress, Pipeline, PipelineOutcome, PipelineStage, ProgressSink, StructuralAnalysis, analyze,
};
pub use config::{AnalyzerConfig, ConfigError};
pub use explain::{
    Correlation, ExplainParseError, ExplainRow, HighlightLevel, TableWarning, WarningLedger,
    WarningType, correlate, parse_explain_output,
};
pub use hints::{PerformanceHint, Severity};
pub use report::{ReportRow, TableReport, render_structural};
pub use stats::{QueryStatistics, StatValue};
pub use syntax::{SyntaxError, Vendor};
pub use usage::{AliasMap, TableKey, TableUsage, TableUsages};
