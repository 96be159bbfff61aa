//! Configuration management for the fraud screen

use crate::evaluator::RuleThresholds;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// How the timestamp field of an input line is turned into an integer
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimestampMode {
    /// Strip every non-digit character, then parse what is left
    #[default]
    Lenient,
    /// Parse the trimmed field as-is
    Strict,
}

/// Time zone used for the human-readable timestamp column
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayZone {
    /// Local system time zone
    #[default]
    Local,
    Utc,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub rules: RuleThresholds,
    pub logging: LoggingConfig,
}

/// Transaction source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Line-oriented transaction file
    pub path: String,
    #[serde(default)]
    pub timestamp_mode: TimestampMode,
    #[serde(default)]
    pub display_zone: DisplayZone,
}

/// Flagged output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Destination of the flagged-transactions CSV
    pub flagged_path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: InputConfig {
                path: "transactions.csv".to_string(),
                timestamp_mode: TimestampMode::Lenient,
                display_zone: DisplayZone::Local,
            },
            output: OutputConfig {
                flagged_path: "fraudulent_transactions.csv".to_string(),
            },
            rules: RuleThresholds::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
