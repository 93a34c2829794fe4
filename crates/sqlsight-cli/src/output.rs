//! Terminal output for analysis outcomes

use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use sqlsight_analyzer::report::{apply_warnings, table_reports};
use sqlsight_analyzer::{
    ExplainReport, ExplainRow, ExplainStep, HighlightLevel, PipelineOutcome, TableReport,
    render_structural,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn render(outcome: &PipelineOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(outcome)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)? + "\n"),
    }
}

pub fn render_text(outcome: &PipelineOutcome) -> String {
    let mut out = render_structural(&outcome.structural);
    if !outcome.structural.is_valid {
        out.push('\n');
        return out;
    }

    let explain = outcome.explain.report();
    // Plan warnings belong to the explained statement, which may not be the first one
    let usages = match (explain, &outcome.structural.explain_target) {
        (Some(_), Some(target)) => &target.table_usages,
        _ => &outcome.structural.table_usages,
    };
    let mut reports = table_reports(usages);
    if let Some(explain) = explain {
        apply_warnings(&mut reports, &explain.new_warnings);
    }
    for report in &reports {
        let highlight = explain.and_then(|e| e.correlation.highlight_for(&report.table));
        out.push('\n');
        out.push_str(&table_report(report, highlight));
    }

    match &outcome.explain {
        ExplainStep::Completed(explain) => out.push_str(&explain_section(explain)),
        ExplainStep::Failed(error) => {
            out.push_str(&format!("\n--- EXPLAIN Failed ---\n{}\n", error.user_message()));
        }
        ExplainStep::Skipped(reason) => {
            out.push_str(&format!("\nEXPLAIN skipped: {reason}\n"));
        }
    }
    out
}

fn table_report(report: &TableReport, highlight: Option<HighlightLevel>) -> String {
    let (marker, color) = match highlight {
        Some(HighlightLevel::Critical) => (" [CRITICAL]", Some(Color::Red)),
        Some(HighlightLevel::Caution) => (" [CAUTION]", Some(Color::Yellow)),
        None => ("", None),
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Category", "Item", "Notes"]);
    for row in &report.rows {
        let category = match color {
            Some(color) if row.category == sqlsight_analyzer::report::WARNING_CATEGORY => {
                Cell::new(&row.category).fg(color)
            }
            _ => Cell::new(&row.category),
        };
        table.add_row(vec![category, Cell::new(&row.item), Cell::new(&row.notes)]);
    }

    format!("=== {}{marker} ===\n{table}\n", report.table)
}

fn explain_section(explain: &ExplainReport) -> String {
    let mut out = String::from("\n--- EXPLAIN ---\n");
    out.push_str(&format!("Explain Time: {} ms\n", explain.elapsed_ms));
    if !explain.rows.is_empty() {
        out.push_str(&format!("{}\n", explain_table(&explain.rows)));
    }
    out.push_str(&explain.correlation.narrative);
    out
}

fn explain_table(rows: &[ExplainRow]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    if let Some(first) = rows.first() {
        table.set_header(first.columns().map(|(label, _)| label).collect::<Vec<_>>());
    }
    for row in rows {
        table.add_row(
            row.columns()
                .map(|(label, _)| row.text(label).unwrap_or_else(|| "NULL".to_string()))
                .collect::<Vec<_>>(),
        );
    }
    table
}
