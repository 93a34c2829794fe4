//! CLI entry point for `sqlsight`.

mod explain_file;
mod logging;
mod output;
mod settings_file;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlsight_analyzer::{
    AnalysisContext, AnalyzerConfig, ExplainRunner, Pipeline, PipelineStage, Vendor,
    WarningLedger,
};

use crate::explain_file::FileExplainRunner;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "sqlsight",
    version,
    about = "Structural SQL analysis with EXPLAIN plan correlation"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print debug diagnostics to stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Write diagnostics as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze the first statement of a SQL script
    Analyze(AnalyzeArgs),

    /// Print the effective analyzer configuration as TOML
    Config {
        /// Configuration file (defaults to the user config file)
        #[arg(long, env = "SQLSIGHT_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// SQL file to analyze; reads stdin when omitted or `-`
    file: Option<PathBuf>,

    /// Database vendor whose dialect is used for parsing
    #[arg(long, env = "SQLSIGHT_VENDOR")]
    vendor: Option<Vendor>,

    /// Connection URL; only used to detect the vendor
    #[arg(long, env = "SQLSIGHT_URL")]
    url: Option<String>,

    /// EXPLAIN output captured for the statement (JSON or client table text)
    #[arg(long)]
    explain: Option<PathBuf>,

    /// Row estimate above which EXPLAIN rows raise a warning
    #[arg(long)]
    row_threshold: Option<u64>,

    /// Configuration file (defaults to the user config file)
    #[arg(long, env = "SQLSIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        logging::LoggingConfig::verbose()
    } else {
        logging::LoggingConfig::default()
    };
    if let Err(e) = logging::init(logging.with_json(cli.log_json)) {
        eprintln!("Error initializing logging: {e}");
    }

    let result = match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Config { config } => print_config(config.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<ExitCode> {
    let sql = read_sql(args.file.as_deref())?;

    let mut config = settings_file::load_config(args.config.as_deref())?;
    if let Some(threshold) = args.row_threshold {
        config = config.with_row_threshold(threshold);
        config.validate()?;
    }

    let vendor = args
        .vendor
        .or_else(|| args.url.as_deref().map(Vendor::from_connection_url))
        .unwrap_or_default();
    tracing::debug!(%vendor, ?config, "starting analysis");

    let runner = args.explain.map(FileExplainRunner::new);
    let pipeline = Pipeline::new(AnalysisContext { vendor, config });
    let mut ledger = WarningLedger::new();
    let progress = |stage: PipelineStage| tracing::info!(stage = stage.as_str(), "pipeline");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let outcome = runtime.block_on(pipeline.run(
        &sql,
        runner.as_ref().map(|r| r as &dyn ExplainRunner),
        &mut ledger,
        &progress,
    ));

    print!("{}", output::render(&outcome, args.format)?);

    Ok(if outcome.structural.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_config(path: Option<&Path>) -> Result<ExitCode> {
    let config: AnalyzerConfig = settings_file::load_config(path)?;
    print!("{}", toml::to_string(&config).context("Failed to serialize config")?);
    Ok(ExitCode::SUCCESS)
}

fn read_sql(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut sql = String::new();
            std::io::stdin()
                .read_to_string(&mut sql)
                .context("Failed to read SQL from stdin")?;
            Ok(sql)
        }
    }
}
