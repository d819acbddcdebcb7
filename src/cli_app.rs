//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use storage_gauge::catalog::CategoryCatalog;
use storage_gauge::core::config::Config;
use storage_gauge::core::errors::GaugeError;
use storage_gauge::core::units::{format_size, format_size_opt, parse_size};
use storage_gauge::journal::jsonl::{JournalEntry, JournalEvent, JournalWriter, Severity};
use storage_gauge::probe::measurer_from_config;
use storage_gauge::report::aggregator::ExternalFigures;
use storage_gauge::report::builder::Report;
use storage_gauge::report::engine::GaugeEngine;

/// Storage Gauge: measures named categories of disk usage and reports them
/// against a configured limit.
#[derive(Debug, Parser)]
#[command(
    name = "sgauge",
    author,
    version,
    about = "Storage Gauge - disk usage reporting",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Measure every category and print the usage report.
    Report(ReportArgs),
    /// Measure specific paths with the configured probe strategy.
    Measure(MeasureArgs),
    /// Print the category catalog: names, paths, containment.
    Categories,
    /// Show, initialize, or validate configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct ReportArgs {
    /// Merge an externally measured figure, e.g. `--external db=1.5GB`.
    #[arg(long, value_name = "LABEL=SIZE")]
    external: Vec<String>,
}

#[derive(Debug, Clone, Args)]
struct MeasureArgs {
    /// Paths to measure.
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Write a default config file and exit.
    #[arg(long, conflicts_with = "validate")]
    init: bool,
    /// Validate configuration and exit.
    #[arg(long, conflicts_with = "init")]
    validate: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

/// Map engine errors onto the CLI exit-code contract.
fn cli_error(error: GaugeError) -> CliError {
    if matches!(error, GaugeError::ChannelClosed { .. }) {
        CliError::Internal(error.to_string())
    } else if error.is_configuration() {
        CliError::User(error.to_string())
    } else {
        CliError::Runtime(error.to_string())
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Report(args) => run_report(cli, args),
        Command::Measure(args) => run_measure(cli, args),
        Command::Categories => run_categories(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn run_report(cli: &Cli, args: &ReportArgs) -> Result<(), CliError> {
    let started = Instant::now();
    let external = parse_external(&args.external)?;

    let config = Config::load(cli.config.as_deref()).map_err(cli_error)?;
    let mut journal = JournalWriter::open(config.journal.clone());
    journal_config_loaded(&mut journal, &config);

    let engine = GaugeEngine::from_config(&config).map_err(cli_error)?;
    let report = match engine.produce_report(&external) {
        Ok(report) => report,
        Err(error) => {
            let mut entry = JournalEntry::new(JournalEvent::MeasureFailed, Severity::Critical);
            entry.error_code = Some(error.code().to_string());
            entry.error_message = Some(error.to_string());
            journal.write_entry(&entry);
            journal.flush();
            return Err(cli_error(error));
        }
    };

    for failure in &report.failures {
        let mut entry = JournalEntry::new(JournalEvent::MeasureFailed, Severity::Warning);
        entry.category = Some(failure.category.clone());
        entry.path = Some(failure.path.display().to_string());
        entry.error_message = Some(failure.detail.clone());
        journal.write_entry(&entry);
    }
    if report.system_clamped {
        let mut entry = JournalEntry::new(JournalEvent::OverlapClamped, Severity::Warning);
        entry.details =
            Some("enclosed categories exceed the root; system clamped to zero".to_string());
        journal.write_entry(&entry);
    }

    let root = engine.catalog().root().map(|category| category.name.clone());
    let exceeded = exceeded_limit(&report, root.as_deref(), engine.limit());
    if let Some((total, limit)) = exceeded {
        let mut entry = JournalEntry::new(JournalEvent::LimitExceeded, Severity::Warning);
        entry.bytes = Some(total);
        entry.details = Some(format!(
            "usage {} exceeds limit {}",
            format_size(total),
            format_size(limit)
        ));
        journal.write_entry(&entry);
    }

    let mut entry = JournalEntry::new(JournalEvent::ReportComplete, Severity::Info);
    entry.duration_ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
    if let Some(name) = root.as_deref()
        && let Some(total) = report.get(name)
    {
        entry.bytes = Some(total.raw);
    }
    journal.write_entry(&entry);
    journal.flush();

    match output_mode(cli) {
        OutputMode::Human => print_report_human(cli, &report, &engine, exceeded),
        OutputMode::Json => {
            let payload = serde_json::to_value(&report)?;
            write_json_line(&payload)?;
        }
    }

    // Partial figures are explicit in the report, not a process failure.
    Ok(())
}

/// Total usage and limit when the root category exceeds the configured limit.
fn exceeded_limit(report: &Report, root: Option<&str>, limit: Option<u64>) -> Option<(u64, u64)> {
    let limit = limit?;
    let total = report.get(root?)?;
    (total.raw > limit).then_some((total.raw, limit))
}

struct ReportRow {
    label: String,
    size: String,
    percent: Option<u64>,
    partial: bool,
}

fn report_rows(report: &Report, limit: Option<u64>) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = report
        .entries
        .iter()
        .map(|(label, figure)| ReportRow {
            label: label.clone(),
            size: figure.formatted.clone(),
            percent: figure.percent_of_limit,
            partial: figure.partial,
        })
        .collect();
    // `free` is undefined past the limit; say so instead of dropping the row.
    if limit.is_some() && !report.entries.contains_key("free") {
        rows.push(ReportRow {
            label: "free".to_string(),
            size: format_size_opt(None),
            percent: None,
            partial: false,
        });
        rows.sort_by(|left, right| left.label.cmp(&right.label));
    }
    rows
}

fn print_report_human(
    cli: &Cli,
    report: &Report,
    engine: &GaugeEngine,
    exceeded: Option<(u64, u64)>,
) {
    if !cli.quiet {
        println!("Usage at {}", report.generated_at);
        println!();
        println!("  {:<12} {:>12} {:>8}", "Label", "Size", "Limit%");
        println!("  {}", "-".repeat(34));
        for row in report_rows(report, engine.limit()) {
            let percent = row
                .percent
                .map_or_else(|| "-".to_string(), |value| format!("{value}%"));
            let marker = if row.partial {
                format!("  {}", "(partial)".yellow())
            } else {
                String::new()
            };
            println!("  {:<12} {:>12} {:>8}{}", row.label, row.size, percent, marker);
        }
        println!();

        if cli.verbose {
            println!("Categories:");
            for category in engine.catalog() {
                println!("  {}:", category.name);
                for path in &category.paths {
                    println!("    {}", path.display());
                }
            }
            println!();
        }
    }

    if let Some((total, limit)) = exceeded {
        eprintln!(
            "{}",
            format!(
                "limit exceeded: {} used of {}",
                format_size(total),
                format_size(limit)
            )
            .red()
        );
    }
    if report.system_clamped {
        eprintln!(
            "{}",
            "warning: enclosed categories exceed the root; system clamped to zero".yellow()
        );
    }
    for failure in &report.failures {
        eprintln!(
            "{}",
            format!(
                "warning: {} ({}): {}",
                failure.category,
                failure.path.display(),
                failure.detail
            )
            .yellow()
        );
    }
}

fn run_measure(cli: &Cli, args: &MeasureArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref()).map_err(cli_error)?;
    let measurer = measurer_from_config(&config.probe);

    let mut results = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        results.push((path, measurer.measure(path)));
    }
    let failed = results.iter().filter(|(_, outcome)| outcome.is_err()).count();

    match output_mode(cli) {
        OutputMode::Human => {
            for (path, outcome) in &results {
                match outcome {
                    Ok(bytes) => println!("{:>12}  {}", format_size(*bytes), path.display()),
                    Err(error) => println!("{:>12}  {}  ({error})", "error", path.display()),
                }
            }
        }
        OutputMode::Json => {
            let rows: Vec<Value> = results
                .iter()
                .map(|(path, outcome)| match outcome {
                    Ok(bytes) => json!({
                        "path": path.to_string_lossy(),
                        "bytes": bytes,
                        "formatted": format_size(*bytes),
                    }),
                    Err(error) => json!({
                        "path": path.to_string_lossy(),
                        "error": error.to_string(),
                        "error_code": error.code(),
                    }),
                })
                .collect();
            let payload = json!({
                "command": "measure",
                "results": rows,
            });
            write_json_line(&payload)?;
        }
    }

    if failed > 0 && failed == results.len() {
        return Err(CliError::Runtime(
            "no requested path could be measured".to_string(),
        ));
    }
    Ok(())
}

fn run_categories(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref()).map_err(cli_error)?;
    let catalog = CategoryCatalog::from_config(&config).map_err(cli_error)?;

    match output_mode(cli) {
        OutputMode::Human => {
            for category in &catalog {
                println!("{}", category.name);
                for path in &category.paths {
                    println!("  {}", path.display());
                }
                if !category.encloses.is_empty() {
                    println!("  encloses: {}", category.encloses.join(", "));
                }
            }
        }
        OutputMode::Json => {
            let categories: Vec<Value> = catalog
                .iter()
                .map(|category| {
                    json!({
                        "name": category.name,
                        "paths": category
                            .paths
                            .iter()
                            .map(|path| path.to_string_lossy())
                            .collect::<Vec<_>>(),
                        "encloses": category.encloses,
                    })
                })
                .collect();
            let payload = json!({
                "command": "categories",
                "categories": categories,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    if args.init {
        return run_config_init(cli);
    }
    if args.validate {
        return run_config_validate(cli);
    }

    let config = Config::load(cli.config.as_deref()).map_err(cli_error)?;
    match output_mode(cli) {
        OutputMode::Human => {
            let toml_str = config.to_toml().map_err(cli_error)?;
            println!("{toml_str}");
        }
        OutputMode::Json => {
            let value = serde_json::to_value(&config)?;
            let payload = json!({
                "command": "config show",
                "config": value,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_config_init(cli: &Cli) -> Result<(), CliError> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    if config_path.exists() {
        return Err(CliError::User(format!(
            "config file already exists: {}",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|error| CliError::Runtime(format!("create config dir: {error}")))?;
    }
    let toml_str = Config::default().to_toml().map_err(cli_error)?;
    std::fs::write(&config_path, &toml_str)
        .map_err(|error| CliError::Runtime(format!("write config: {error}")))?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("Wrote default config: {}", config_path.display());
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "config init",
                "path": config_path.to_string_lossy(),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_config_validate(cli: &Cli) -> Result<(), CliError> {
    match Config::load(cli.config.as_deref()) {
        Ok(config) => {
            let hash = config
                .stable_hash()
                .map_err(|error| CliError::Runtime(error.to_string()))?;
            let source = config.config_file.as_ref().map_or_else(
                || "(defaults)".to_string(),
                |path| path.display().to_string(),
            );

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("Configuration is valid.");
                    println!("  Source: {source}");
                    println!("  Hash: {hash}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config validate",
                        "valid": true,
                        "source": source,
                        "hash": hash,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Err(error) => {
            match output_mode(cli) {
                OutputMode::Human => {
                    eprintln!("Configuration is INVALID: {error}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config validate",
                        "valid": false,
                        "error": error.to_string(),
                        "error_code": error.code(),
                    });
                    write_json_line(&payload)?;
                }
            }
            Err(CliError::User(format!("invalid config: {error}")))
        }
    }
}

fn journal_config_loaded(journal: &mut JournalWriter, config: &Config) {
    let mut entry = JournalEntry::new(JournalEvent::ConfigLoaded, Severity::Info);
    entry.config_hash = config.stable_hash().ok();
    entry.path = config
        .config_file
        .as_ref()
        .map(|path| path.display().to_string());
    journal.write_entry(&entry);
}

/// Parse `LABEL=SIZE` pairs from repeated `--external` flags.
fn parse_external(raw: &[String]) -> Result<ExternalFigures, CliError> {
    let mut figures = ExternalFigures::new();
    for pair in raw {
        let (label, size) = pair.split_once('=').ok_or_else(|| {
            CliError::User(format!(
                "invalid external figure {pair:?}, expected LABEL=SIZE"
            ))
        })?;
        let label = label.trim();
        if label.is_empty() {
            return Err(CliError::User(format!(
                "external figure {pair:?} has an empty label"
            )));
        }
        let bytes = parse_size(size)
            .map_err(|error| CliError::User(format!("external figure {pair:?}: {error}")))?;
        figures.insert(label, bytes);
    }
    Ok(figures)
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SGAUGE_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        Some("auto") | None => fallback,
        Some(_) => fallback,
    }
}
