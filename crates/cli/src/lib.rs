//! Marine Data Pipeline Application
//!
//! Loads raw sensor tables, runs the validation pipeline and writes the
//! validated data, the structured report and the error log.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use marine_validator::{
    select_range, ColumnProjector, DateRange, Pipeline, PipelineConfig, PipelineOutcome,
};
use std::path::{Path, PathBuf};
use storage::{CsvTable, JsonReportFile, ReportSink, TableSink, TableSource};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Default configuration file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "marine-pipeline.toml";

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "MARINE";

#[derive(Debug, Parser)]
#[command(name = "marine-pipeline")]
#[command(about = "Validate marine sensor data and extract date-range reports")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a raw table and write the cleaned data
    Validate(ValidateArgs),
    /// Extract validated rows between two dates
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Raw CSV, header on the first line
    #[arg(long)]
    pub input: PathBuf,
    /// Validated CSV to write
    #[arg(long)]
    pub output: PathBuf,
    /// JSON report to write
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// CSV error log to append to
    #[arg(long)]
    pub error_log: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Validated CSV produced by `validate`
    #[arg(long)]
    pub input: PathBuf,
    /// First day, DD-MM-YYYY
    #[arg(long)]
    pub from: String,
    /// Last day, DD-MM-YYYY
    #[arg(long)]
    pub to: String,
    /// CSV to write the selected rows to
    #[arg(long)]
    pub output: PathBuf,
}

/// Initialize logging
///
/// Level comes from `RUST_LOG`, defaulting to `info`.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {e}");
    }
}

/// Load pipeline configuration from an optional file plus `MARINE__*` overrides
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    load_config_from(path, None)
}

/// Same as [`load_config`], reading overrides from `env` instead of the
/// process environment when given
fn load_config_from(
    path: &Path,
    env: Option<config::Map<String, String>>,
) -> Result<PipelineConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()
        .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

    let config: PipelineConfig = settings
        .try_deserialize()
        .context("Invalid pipeline configuration")?;
    info!("Loaded configuration: {:?}", config);
    Ok(config)
}

/// Validate the input table and write every output that was asked for
///
/// Outputs are written even when a stage failed, so the report and error log
/// describe how far the run got.
pub fn validate(args: &ValidateArgs, config: PipelineConfig) -> Result<PipelineOutcome> {
    let table = CsvTable::new(&args.input)
        .load()
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let outcome = Pipeline::new(config)
        .run(table)
        .context("Input table failed the schema check")?;

    let mut failed_writes = Vec::new();

    if let Err(e) = CsvTable::new(&args.output).store(&outcome.to_table()) {
        error!("Could not write validated data: {}", e);
        failed_writes.push(args.output.display().to_string());
    }

    if let Some(path) = &args.report {
        if let Err(e) = JsonReportFile::new(path).store_report(&outcome.report) {
            error!("Could not write report: {}", e);
            failed_writes.push(path.display().to_string());
        }
    }

    if let Some(path) = &args.error_log {
        if let Err(e) = CsvTable::new(path).append(&outcome.report.error_log_rows()) {
            error!("Could not append to error log: {}", e);
            failed_writes.push(path.display().to_string());
        }
    }

    for failure in &outcome.report.failures {
        warn!("Stage {} did not finish: {}", failure.stage, failure.description);
    }

    if !failed_writes.is_empty() {
        bail!("Failed to write {}", failed_writes.join(", "));
    }
    Ok(outcome)
}

/// Write the validated rows falling between two days, returning how many
pub fn report(args: &ReportArgs, config: &PipelineConfig) -> Result<usize> {
    let range = DateRange::parse(&args.from, &args.to)?;

    let table = CsvTable::new(&args.input)
        .load()
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    let mut rows = table.into_iter();
    let header = rows
        .next()
        .with_context(|| format!("{} is empty", args.input.display()))?;
    let dataset = ColumnProjector::resolve(&header)?.project(rows.collect())?;

    let selected = select_range(&dataset, &range, &config.timestamp.display_format)?;
    CsvTable::new(&args.output)
        .store(&selected.to_table())
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    Ok(selected.len())
}

/// Run one command
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Validate(args) => {
            let outcome = validate(&args, config)?;
            let report = &outcome.report;
            println!("Validation run {}", report.run_id);
            println!("   Rows in:              {}", report.input_rows);
            println!("   Missing-value rows:   {}", report.missing_rows_removed);
            println!("   Duplicates removed:   {}", report.duplicates_removed);
            for group in &report.outliers {
                println!("   Outliers ({:<11}) {}", format!("{}):", group.group), group.rows.len());
            }
            println!("   Timestamps rejected:  {}", report.timestamps_rejected());
            println!("   Rows out:             {}", report.output_rows);
            if !outcome.is_complete() {
                println!("   Stage failures:       {}", report.failures.len());
            }
        }
        Command::Report(args) => {
            let count = report(&args, &config)?;
            println!("Wrote {} rows to {}", count, args.output.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use marine_validator::{Deviation, TimestampPolicy, REQUIRED_COLUMNS};

    fn raw_csv() -> String {
        let header = REQUIRED_COLUMNS.join(",");
        let line = |time: &str, fill: &str| {
            let mut cells = vec![time.to_string()];
            cells.extend((1..REQUIRED_COLUMNS.len()).map(|_| fill.to_string()));
            cells.join(",")
        };
        [
            header,
            line("2023-01-01T00:00:00Z", "1"),
            line("2023-01-15T00:00:00Z", "2"),
            line("2023-01-15T00:00:00Z", "2"),
            line("2023-02-01T00:00:00Z", ""),
            line("2023-02-02 00:00:00", "3"),
        ]
        .join("\n")
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(
            &path,
            "[outlier]\ndeviation = \"sample\"\n\n[timestamp]\npolicy = \"calendar\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.outlier.deviation, Deviation::Sample);
        assert_eq!(config.outlier.threshold, 3.0);
        assert_eq!(config.timestamp.policy, TimestampPolicy::Calendar);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.outlier.threshold, PipelineConfig::default().outlier.threshold);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "[outlier]\nthreshold = 4.0\nmin_samples = 5\n").unwrap();

        let env = [
            ("MARINE__OUTLIER__THRESHOLD", "2.5"),
            ("MARINE__TIMESTAMP__POLICY", "calendar"),
            ("OTHER__OUTLIER__MIN_SAMPLES", "9"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = load_config_from(&path, Some(env)).unwrap();
        assert_eq!(config.outlier.threshold, 2.5);
        assert_eq!(config.outlier.min_samples, 5);
        assert_eq!(config.timestamp.policy, TimestampPolicy::Calendar);
    }

    #[test]
    fn test_validate_then_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.csv");
        std::fs::write(&input, raw_csv()).unwrap();

        let args = ValidateArgs {
            input,
            output: dir.path().join("validated.csv"),
            report: Some(dir.path().join("report.json")),
            error_log: Some(dir.path().join("errors.csv")),
        };
        let outcome = validate(&args, PipelineConfig::default()).unwrap();
        assert_eq!(outcome.report.missing_rows_removed, 1);
        assert_eq!(outcome.report.duplicates_removed, 1);
        assert_eq!(outcome.report.timestamps_rejected(), 1);
        assert_eq!(outcome.dataset.len(), 2);
        assert!(dir.path().join("report.json").exists());

        let validated = CsvTable::new(&args.output).load().unwrap();
        assert_eq!(validated.len(), 3);
        assert_eq!(validated[1][0], "01-01-2023T00:00:00");

        let log = CsvTable::new(dir.path().join("errors.csv")).load().unwrap();
        assert_eq!(log[0][2], "category");
        assert!(log.len() > 1);

        let report_args = ReportArgs {
            input: args.output.clone(),
            from: "10-01-2023".to_string(),
            to: "31-01-2023".to_string(),
            output: dir.path().join("user_report.csv"),
        };
        assert_eq!(report(&report_args, &PipelineConfig::default()).unwrap(), 1);
    }

    #[test]
    fn test_schema_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.csv");
        std::fs::write(&input, "time,Gust\n2023-01-01T00:00:00Z,1\n").unwrap();

        let args = ValidateArgs {
            input,
            output: dir.path().join("validated.csv"),
            report: None,
            error_log: None,
        };
        let err = validate(&args, PipelineConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("Missing required column"));
        assert!(!args.output.exists());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "marine-pipeline",
            "validate",
            "--input",
            "raw.csv",
            "--output",
            "out.csv",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Validate(ValidateArgs { report: None, .. })));
    }
}
