//! Analysis Pipeline
//!
//! Ties the passes together. [`analyze`] runs the synchronous structural analysis
//! (parse, alias map, column usage, statistics, hints) and always returns a value;
//! parse failures are carried in the result. [`Pipeline`] adds the optional EXPLAIN
//! round-trip through an [`ExplainRunner`] and reports its progress as it goes.
//!
//! Structural analysis and EXPLAIN correlation fail independently: a database error
//! is reported next to the structural result, never instead of it.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AnalyzerConfig;
use crate::explain::{Correlation, ExplainRow, TableWarning, WarningLedger, correlate_with};
use crate::hints::{self, PerformanceHint};
use crate::stats::{self, QueryStatistics};
use crate::syntax::{ParsedStatement, Statement, SyntaxError, Vendor, parse};
use crate::usage::{AliasMap, TableUsages, extract};

/// Statement type reported when the input held no statements
pub const EMPTY_STATEMENT_TYPE: &str = "EMPTY";

/// Immutable inputs shared by every analysis call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub vendor: Vendor,
    pub config: AnalyzerConfig,
}

impl AnalysisContext {
    pub fn new(vendor: Vendor) -> Self {
        Self {
            vendor,
            config: AnalyzerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }
}

/// Result of the structural analysis of a script's first statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralAnalysis {
    pub is_valid: bool,
    /// Rendered parse error, when the script did not parse
    pub error: Option<String>,
    pub syntax_errors: Vec<SyntaxError>,
    pub statement_type: String,
    pub table_usages: TableUsages,
    pub statistics: QueryStatistics,
    pub hints: Vec<PerformanceHint>,
    pub alias_map: AliasMap,
    /// The first statement the database can EXPLAIN
    pub explain_target: Option<ExplainTarget>,
}

impl StructuralAnalysis {
    /// SQL of the statement sent to EXPLAIN, if any
    pub fn explainable_sql(&self) -> Option<&str> {
        self.explain_target.as_ref().map(|target| target.sql.as_str())
    }

    fn parse_failure(errors: Vec<SyntaxError>) -> Self {
        let error = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            is_valid: false,
            error: Some(error),
            syntax_errors: errors,
            ..Self::default()
        }
    }

    fn empty() -> Self {
        Self {
            is_valid: true,
            statement_type: EMPTY_STATEMENT_TYPE.to_string(),
            hints: vec![hints::empty_query_hint()],
            ..Self::default()
        }
    }
}

/// The statement EXPLAIN runs on, with the usage its plan rows are matched against
///
/// This need not be the analyzed statement: a script may open with DDL or `SET`
/// before the query worth explaining.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainTarget {
    pub sql: String,
    pub alias_map: AliasMap,
    pub table_usages: TableUsages,
}

impl ExplainTarget {
    fn new(parsed: &ParsedStatement) -> Self {
        let alias_map = AliasMap::build(&parsed.statement);
        let table_usages = extract(&parsed.statement, &alias_map);
        Self {
            sql: parsed.sql.clone(),
            alias_map,
            table_usages,
        }
    }
}

/// Parses and analyzes `sql`
pub fn analyze(sql: &str, context: &AnalysisContext) -> StructuralAnalysis {
    analyze_parsed(parse(sql, context.vendor), context)
}

fn analyze_parsed(
    parsed: Result<Vec<ParsedStatement>, Vec<SyntaxError>>,
    context: &AnalysisContext,
) -> StructuralAnalysis {
    let statements = match parsed {
        Ok(statements) => statements,
        Err(errors) => return StructuralAnalysis::parse_failure(errors),
    };
    let Some(first) = statements.first() else {
        return StructuralAnalysis::empty();
    };

    let statement = &first.statement;
    let alias_map = AliasMap::build(statement);
    let table_usages = extract(statement, &alias_map);
    let mut statistics = stats::collect(statement);
    if matches!(statement, Statement::Select(_)) {
        stats::attach_usage_totals(&mut statistics, &table_usages);
    }
    let hints = hints::generate(statement, &table_usages, &statistics, &context.config);

    let explain_target = statements
        .iter()
        .position(|parsed| parsed.statement.kind().is_explainable())
        .map(|index| match index {
            0 => ExplainTarget {
                sql: first.sql.clone(),
                alias_map: alias_map.clone(),
                table_usages: table_usages.clone(),
            },
            _ => ExplainTarget::new(&statements[index]),
        });

    if statements.len() > 1 {
        tracing::debug!(
            statements = statements.len(),
            "analyzing the first statement of the script"
        );
    }

    StructuralAnalysis {
        is_valid: true,
        error: None,
        syntax_errors: Vec::new(),
        statement_type: statement.type_name().to_string(),
        table_usages,
        statistics,
        hints,
        alias_map,
        explain_target,
    }
}

/// Errors reported by the database while running EXPLAIN
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DbError {
    /// The database rejected a column or session variable it does not know
    #[error("Unresolved reference: {message}")]
    UnresolvedReference { message: String },

    #[error("{message}")]
    Other { message: String },
}

impl DbError {
    /// Classifies a raw driver message
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("unknown column") || lower.contains("unknown variable") {
            Self::UnresolvedReference { message }
        } else {
            Self::Other { message }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::UnresolvedReference { message } | Self::Other { message } => message,
        }
    }

    /// Text to show the user, with remediation advice where there is any
    pub fn user_message(&self) -> String {
        match self {
            Self::UnresolvedReference { .. } => "Database doesn't recognize variables like '@workspace_id'. \
                 Remove SET commands and replace variables with literal values in your query before analyzing."
                .to_string(),
            Self::Other { message } => format!("Error executing EXPLAIN: {message}"),
        }
    }
}

/// Runs EXPLAIN statements against a live database
#[async_trait]
pub trait ExplainRunner: Send + Sync {
    /// Establishes the connection, if the runner needs one
    async fn connect(&self) -> Result<(), DbError> {
        Ok(())
    }

    /// Executes a complete `EXPLAIN ...` statement and returns its rows
    async fn run_explain(&self, sql: &str) -> Result<Vec<ExplainRow>, DbError>;
}

/// Stages reported while the pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Parsing the script
    Parsing,
    /// Running the structural passes
    Analyzing,
    /// Opening the runner's connection
    Connecting,
    /// Waiting on the database's EXPLAIN
    ExecutingExplain,
    /// Matching plan rows back onto tables
    Correlating,
    /// Finished, whatever the EXPLAIN outcome
    Complete,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsing => "Parsing SQL",
            Self::Analyzing => "Analyzing structure",
            Self::Connecting => "Connecting",
            Self::ExecutingExplain => "Executing EXPLAIN",
            Self::Correlating => "Correlating plan",
            Self::Complete => "Complete",
        }
    }
}

/// Receives pipeline progress
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: PipelineStage);
}

impl<F> ProgressSink for F
where
    F: Fn(PipelineStage) + Send + Sync,
{
    fn report(&self, stage: PipelineStage) {
        self(stage)
    }
}

/// A sink that discards progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _stage: PipelineStage) {}
}

/// Result of a successful EXPLAIN round-trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainReport {
    pub sql: String,
    pub rows: Vec<ExplainRow>,
    pub correlation: Correlation,
    /// Warnings not seen earlier in the session
    pub new_warnings: Vec<TableWarning>,
    pub elapsed_ms: u64,
}

/// What happened to the EXPLAIN step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ExplainStep {
    Skipped(String),
    Failed(DbError),
    Completed(ExplainReport),
}

impl ExplainStep {
    pub fn report(&self) -> Option<&ExplainReport> {
        match self {
            Self::Completed(report) => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub structural: StructuralAnalysis,
    pub explain: ExplainStep,
}

/// Runs the structural analysis and, when a runner is available, the EXPLAIN step
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    context: AnalysisContext,
}

impl Pipeline {
    pub fn new(context: AnalysisContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    /// Analyzes `sql`, then explains and correlates it through `runner`
    ///
    /// Warnings are passed through `ledger`, so rerunning the same statement in a
    /// session reports each `(table, warning type)` pair once.
    pub async fn run(
        &self,
        sql: &str,
        runner: Option<&dyn ExplainRunner>,
        ledger: &mut WarningLedger,
        progress: &dyn ProgressSink,
    ) -> PipelineOutcome {
        progress.report(PipelineStage::Parsing);
        let parsed = parse(sql, self.context.vendor);

        progress.report(PipelineStage::Analyzing);
        let structural = analyze_parsed(parsed, &self.context);

        let explain = self.explain(&structural, runner, ledger, progress).await;
        progress.report(PipelineStage::Complete);

        PipelineOutcome {
            structural,
            explain,
        }
    }

    async fn explain(
        &self,
        structural: &StructuralAnalysis,
        runner: Option<&dyn ExplainRunner>,
        ledger: &mut WarningLedger,
        progress: &dyn ProgressSink,
    ) -> ExplainStep {
        if !structural.is_valid {
            return ExplainStep::Skipped("SQL did not parse".into());
        }
        let Some(target) = &structural.explain_target else {
            return ExplainStep::Skipped("No statement the database can EXPLAIN".into());
        };
        let Some(runner) = runner else {
            return ExplainStep::Skipped("No database connection".into());
        };

        progress.report(PipelineStage::Connecting);
        if let Err(err) = runner.connect().await {
            tracing::warn!(error = %err, "could not connect for EXPLAIN");
            return ExplainStep::Failed(err);
        }

        progress.report(PipelineStage::ExecutingExplain);
        let sql = format!("EXPLAIN {}", target.sql);
        let start = Instant::now();
        let rows = match runner.run_explain(&sql).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, "EXPLAIN failed");
                return ExplainStep::Failed(err);
            }
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        progress.report(PipelineStage::Correlating);
        let correlation = correlate_with(
            &rows,
            &target.alias_map,
            &target.table_usages,
            &self.context.config,
        );
        let new_warnings = ledger.admit(correlation.warnings.clone());
        tracing::debug!(
            rows = rows.len(),
            warnings = correlation.warnings.len(),
            new_warnings = new_warnings.len(),
            elapsed_ms,
            "EXPLAIN correlated"
        );

        ExplainStep::Completed(ExplainReport {
            sql,
            rows,
            correlation,
            new_warnings,
            elapsed_ms,
        })
    }
}
