//! Record parser: turns one raw input line into a validated transaction.
//!
//! Input lines look like `cardNumber,location,amount,timestamp`. Blank lines
//! and lines starting with `#` are skipped without a diagnostic. Every other
//! line either yields a [`TransactionRecord`] or a [`ParseError`] naming why
//! it was dropped; no partial record is ever produced.

use crate::config::{DisplayZone, TimestampMode};
use crate::types::transaction::TransactionRecord;
use chrono::{Local, TimeZone, Utc};
use thiserror::Error;

const MIN_FIELDS: usize = 4;
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reasons a line is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Line does not have the shape of a record
    #[error("invalid line: {0}")]
    Structural(String),

    /// Amount or timestamp could not be read as a number
    #[error("malformed {field}: {value:?}")]
    Numeric { field: &'static str, value: String },
}

impl ParseError {
    /// Short reason label used for counters and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Structural(_) => "structural",
            ParseError::Numeric { .. } => "numeric",
        }
    }

    fn numeric(field: &'static str, value: &str) -> Self {
        ParseError::Numeric {
            field,
            value: value.to_string(),
        }
    }
}

/// Line parser configured with a timestamp mode and a display zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordParser {
    timestamp_mode: TimestampMode,
    display_zone: DisplayZone,
}

impl RecordParser {
    pub fn new(timestamp_mode: TimestampMode, display_zone: DisplayZone) -> Self {
        Self {
            timestamp_mode,
            display_zone,
        }
    }

    /// Parse one line.
    ///
    /// Returns `Ok(None)` for blank and comment lines.
    pub fn parse(&self, line: &str) -> Result<Option<TransactionRecord>, ParseError> {
        if line.trim().is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut fields: Vec<&str> = line.split(',').collect();
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        if fields.len() < MIN_FIELDS {
            return Err(ParseError::Structural(format!(
                "expected at least {} fields, found {}",
                MIN_FIELDS,
                fields.len()
            )));
        }

        let account_id = fields[0].trim();
        if account_id.is_empty() {
            return Err(ParseError::Structural("empty card number".to_string()));
        }
        let location = fields[1].trim();
        let amount = parse_amount(fields[2])?;
        let timestamp = match self.timestamp_mode {
            TimestampMode::Lenient => parse_timestamp_lenient(fields[3])?,
            TimestampMode::Strict => parse_timestamp_strict(fields[3])?,
        };
        let formatted = format_timestamp(timestamp, self.display_zone)
            .ok_or_else(|| ParseError::numeric("timestamp", fields[3].trim()))?;

        Ok(Some(TransactionRecord::new(
            account_id, location, amount, timestamp, formatted,
        )))
    }
}

fn parse_amount(raw: &str) -> Result<f64, ParseError> {
    let value = raw.trim();
    match value.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => Ok(amount),
        _ => Err(ParseError::numeric("amount", value)),
    }
}

/// Strip every non-digit character, then parse the rest.
///
/// `"1699-0000-0000"` becomes `169900000000`; so does `"t=169900000000ms"`.
/// Multiple digit runs are concatenated, never rejected.
pub fn parse_timestamp_lenient(raw: &str) -> Result<i64, ParseError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<i64>()
        .map_err(|_| ParseError::numeric("timestamp", raw.trim()))
}

/// Parse the trimmed field as a plain integer.
pub fn parse_timestamp_strict(raw: &str) -> Result<i64, ParseError> {
    let value = raw.trim();
    value
        .parse::<i64>()
        .map_err(|_| ParseError::numeric("timestamp", value))
}

/// Render epoch milliseconds as `YYYY-MM-DD HH:mm:ss`.
///
/// Returns `None` when the instant is outside the calendar's range.
pub fn format_timestamp(millis: i64, zone: DisplayZone) -> Option<String> {
    match zone {
        DisplayZone::Local => format_in(&Local, millis),
        DisplayZone::Utc => format_in(&Utc, millis),
    }
}

fn format_in<Tz>(tz: &Tz, millis: i64) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    tz.timestamp_millis_opt(millis)
        .earliest()
        .map(|dt| dt.format(DISPLAY_FORMAT).to_string())
}
