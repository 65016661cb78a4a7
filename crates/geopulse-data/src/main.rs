//! CLI entry point for the GeoPulse data pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use geopulse_data::{
    DataLayout, Pipeline, PipelineConfig, PipelineReport, SourceRegistry, StorageFormat, catalog,
    pipeline::DatasetStatus,
};
use std::path::PathBuf;
use tracing::info;

/// CLI-compatible storage format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStorageFormat {
    /// Comma-separated text
    Csv,
    /// Apache Parquet
    Parquet,
}

impl From<CliStorageFormat> for StorageFormat {
    fn from(cli: CliStorageFormat) -> Self {
        match cli {
            CliStorageFormat::Csv => StorageFormat::Csv,
            CliStorageFormat::Parquet => StorageFormat::Parquet,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Rebuild the processed zone from the raw zone (default)
    Run,
    /// List datasets available in the processed zone
    List,
    /// Print a dataset as split JSON (columns, index, data)
    Show {
        /// Logical dataset name
        name: String,
    },
    /// Print shape and column statistics of a dataset
    Describe {
        /// Logical dataset name
        name: String,
    },
    /// Print the source registry
    Sources,
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "GeoPulse data pipeline",
    long_about = "Ingests arms-trade, macroeconomic and industry datasets, cleans them and \
                  stores them in a uniform shape.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  GEOPULSE_DATA_ROOT    Data root holding raw/ and processed/ (default: data)\n  \
                  RUST_LOG              Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Rebuild everything\n  \
                  geopulse\n\n  \
                  # Inspect the result\n  \
                  geopulse list\n  \
                  geopulse describe gdp\n  \
                  geopulse show all_arms_imports --json | jq .columns"
)]
struct Args {
    /// Data root holding the raw/ and processed/ zones
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    /// JSON registry to use instead of the built-in one
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Format of processed tables
    #[arg(long, value_enum, default_value = "csv", global = true)]
    format: CliStorageFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Exit with an error when any dataset is skipped
    #[arg(long, global = true)]
    strict: bool,

    /// Machine-readable output on stdout; disables logging
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    let config = build_config(&args)?;
    let registry = match &args.registry {
        Some(path) => SourceRegistry::from_json_file(path)?,
        None => SourceRegistry::builtin(),
    };

    match args.command.clone().unwrap_or(Command::Run) {
        Command::Run => run(&args, config, registry),
        Command::List => list(&args, &config),
        Command::Show { name } => show(&config, &name),
        Command::Describe { name } => describe(&args, &config, &name),
        Command::Sources => sources(&args, &registry),
    }
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let data_root = args
        .data_root
        .clone()
        .unwrap_or_else(|| PipelineConfig::from_env().data_root);

    Ok(PipelineConfig::builder()
        .data_root(data_root)
        .storage_format(args.format.into())
        .strict(args.strict)
        .build()?)
}

fn run(args: &Args, config: PipelineConfig, registry: SourceRegistry) -> Result<()> {
    let strict = config.strict;
    info!("Using data root: {}", config.data_root.display());

    let report = Pipeline::builder()
        .config(config)
        .registry(registry)
        .build()?
        .run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.quiet {
        print_human_readable_summary(&report);
    }

    if report.is_total_failure() {
        return Err(anyhow!(
            "All {} datasets failed, nothing was written",
            report.outcomes.len()
        ));
    }
    if !report.is_ok(strict) {
        return Err(anyhow!(
            "{} dataset(s) skipped: {}",
            report.failed().count(),
            report.failed_names().join(", ")
        ));
    }
    Ok(())
}

fn list(args: &Args, config: &PipelineConfig) -> Result<()> {
    let collection = catalog::global(&DataLayout::new(&config.data_root))?;

    if args.json {
        let body = serde_json::json!({ "datasets": collection.list_datasets() });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if collection.is_empty() {
        return Err(anyhow!(
            "No processed data found. Run the pipeline first: geopulse run"
        ));
    }
    for name in collection.list_datasets() {
        println!("{}", name);
    }
    Ok(())
}

fn show(config: &PipelineConfig, name: &str) -> Result<()> {
    let collection = catalog::global(&DataLayout::new(&config.data_root))?;
    let table = collection.get_dataset(name)?;
    println!("{}", serde_json::to_string_pretty(&table.to_split()?)?);
    Ok(())
}

/// Print shape and per-column statistics.
///
/// Uses `println!` on purpose: this is the command's output, not logging.
fn describe(args: &Args, config: &PipelineConfig, name: &str) -> Result<()> {
    let collection = catalog::global(&DataLayout::new(&config.data_root))?;
    let table = collection.get_dataset(name)?;
    let summary = table.describe()?;
    let (rows, columns) = table.shape();

    if args.json {
        let body = serde_json::json!({
            "name": name,
            "provider": table.provider(),
            "rows": rows,
            "columns": columns,
            "index_column": table.index_column(),
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("Dataset: {} ({})", name, table.provider());
    println!("Shape: {} rows, {} columns", rows, columns);
    if let Some(index) = table.index_column() {
        println!("Row labels: {}", index);
    }
    println!();
    println!(
        "{:<24} {:<10} {:>8} {:>8} {:>14} {:>14} {:>14}",
        "Column", "Type", "Count", "Nulls", "Mean", "Min", "Max"
    );
    println!("{}", "-".repeat(98));
    for col in &summary {
        println!(
            "{:<24} {:<10} {:>8} {:>8} {:>14} {:>14} {:>14}",
            truncate_str(&col.name, 23),
            truncate_str(&col.dtype, 9),
            col.count,
            col.null_count,
            fmt_stat(col.mean),
            fmt_stat(col.min),
            fmt_stat(col.max),
        );
    }
    Ok(())
}

fn sources(args: &Args, registry: &SourceRegistry) -> Result<()> {
    if args.json {
        println!("{}", registry.to_json_string()?);
        return Ok(());
    }

    for source in registry.iter() {
        let cleaners: Vec<&str> = source.cleaners.iter().map(|c| c.id()).collect();
        println!(
            "{:<36} {:<11} {}",
            source.name,
            source.provider.to_string(),
            source.path.display()
        );
        if let Some(index) = &source.load_options.index_column {
            println!("{:<36} row labels: {}", "", index);
        }
        if !cleaners.is_empty() {
            println!("{:<36} cleaners: {}", "", cleaners.join(", "));
        }
    }
    Ok(())
}

/// Print a human-readable summary of a pipeline run.
fn print_human_readable_summary(report: &PipelineReport) {
    println!();
    println!("{}", "=".repeat(80));
    println!("PIPELINE COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    for outcome in &report.outcomes {
        match &outcome.status {
            DatasetStatus::Succeeded {
                file,
                rows,
                columns,
            } => println!(
                "  ok    {:<36} {} ({} rows x {} columns)",
                outcome.name,
                file.display(),
                rows,
                columns
            ),
            DatasetStatus::Failed { code, message } => println!(
                "  skip  {:<36} [{}] {}",
                outcome.name, code, message
            ),
        }
    }

    println!();
    println!(
        "Succeeded: {}  Skipped: {}  Duration: {}ms",
        report.succeeded().count(),
        report.failed().count(),
        report.duration_ms
    );
    println!("{}", "=".repeat(80));
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string())
}

fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
