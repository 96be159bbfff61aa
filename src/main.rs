//! Fraud Heuristics Screen - Main Entry Point
//!
//! Reads a transaction file, screens every record and writes the flagged
//! subset to a CSV file.

use anyhow::Result;
use clap::Parser;
use fraud_heuristics::{
    config::{AppConfig, LoggingConfig},
    export::save_flagged,
    BatchScreener,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "fraud-heuristics")]
#[command(version, about = "Heuristic fraud screen for card transaction files", long_about = None)]
struct Cli {
    /// Configuration file (defaults to config/config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transaction file, overrides `input.path`
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Flagged output file, overrides `output.flagged_path`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    summary_json: bool,
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_path(path),
        None if Path::new("config/config.toml").exists() => AppConfig::load(),
        None => Ok(AppConfig::default()),
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("fraud_heuristics={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging)?;

    info!("Starting fraud screen");
    info!(
        "Rules: amount > {:.2}, amount > {:.1}x mean, >= {} transactions within {} ms",
        config.rules.amount_threshold,
        config.rules.anomaly_multiplier,
        config.rules.velocity_count,
        config.rules.velocity_window_ms
    );

    let input = cli
        .input
        .unwrap_or_else(|| PathBuf::from(&config.input.path));
    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.flagged_path));

    let screener = BatchScreener::from_config(&config);
    let report = screener.screen_file(&input);

    if let Some(e) = &report.source_error {
        warn!(error = %e, "Input could not be read completely, results are partial");
    }

    report.metrics.print_summary();

    match save_flagged(&output, report.flagged()) {
        Ok(rows) => info!(path = %output.display(), rows, "Flagged transactions written"),
        Err(e) => error!(error = %format!("{:#}", e), "Error saving fraudulent transactions"),
    }

    if cli.summary_json {
        println!("{}", serde_json::to_string_pretty(&report.metrics.summary())?);
    }

    Ok(())
}
