//! Batch driver: streams raw lines through the parser and the evaluator.

use crate::config::AppConfig;
use crate::evaluator::{FraudEvaluator, RuleThresholds};
use crate::metrics::BatchMetrics;
use crate::parser::{ParseError, RecordParser};
use crate::types::verdict::ScreenedTransaction;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A line the parser rejected
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    /// 1-based line number in the source
    pub line_number: usize,
    pub line: String,
    pub error: ParseError,
}

/// Everything a batch run produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Every valid record with its verdict, in input order
    pub transactions: Vec<ScreenedTransaction>,
    pub skipped: Vec<SkippedLine>,
    pub metrics: BatchMetrics,
    /// Set when reading the source failed; `transactions` then holds
    /// whatever was screened before the failure
    pub source_error: Option<String>,
}

impl BatchReport {
    /// Flagged transactions, in input order
    pub fn flagged(&self) -> impl Iterator<Item = &ScreenedTransaction> {
        self.transactions.iter().filter(|t| t.is_fraud())
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged().count()
    }
}

/// Runs independent batches. Every run starts from empty account state.
#[derive(Debug, Clone, Default)]
pub struct BatchScreener {
    parser: RecordParser,
    thresholds: RuleThresholds,
}

impl BatchScreener {
    pub fn new(parser: RecordParser, thresholds: RuleThresholds) -> Self {
        Self { parser, thresholds }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            RecordParser::new(config.input.timestamp_mode, config.input.display_zone),
            config.rules.clone(),
        )
    }

    /// Screen in-memory lines.
    pub fn screen_lines<I, S>(&self, lines: I) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run(lines.into_iter().map(|l| Ok(l.as_ref().to_string())))
    }

    /// Screen a line-oriented reader. A read error ends the batch early;
    /// bytes that are not valid UTF-8 do not.
    pub fn screen_reader<R: BufRead>(&self, reader: R) -> BatchReport {
        self.run(lossy_lines(reader))
    }

    /// Screen a file. An unreadable file yields an empty report.
    pub fn screen_file<P: AsRef<Path>>(&self, path: P) -> BatchReport {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => {
                info!(path = %path.display(), "Reading transactions");
                self.screen_reader(BufReader::new(file))
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error reading file");
                BatchReport {
                    source_error: Some(format!("{}: {}", path.display(), e)),
                    ..BatchReport::default()
                }
            }
        }
    }

    fn run<I>(&self, lines: I) -> BatchReport
    where
        I: Iterator<Item = io::Result<String>>,
    {
        let mut evaluator = FraudEvaluator::with_thresholds(self.thresholds.clone());
        let mut report = BatchReport::default();

        for (index, line) in lines.enumerate() {
            let line_number = index + 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!(line = line_number, error = %e, "Error reading transactions, stopping batch");
                    report.source_error = Some(e.to_string());
                    break;
                }
            };
            report.metrics.record_line();

            let record = match self.parser.parse(&line) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    match e {
                        ParseError::Structural(_) => {
                            warn!(line = line_number, content = %line, error = %e, "Skipping invalid line")
                        }
                        ParseError::Numeric { .. } => {
                            warn!(line = line_number, content = %line, error = %e, "Skipping malformed transaction entry")
                        }
                    }
                    report.metrics.record_skip(&e);
                    report.skipped.push(SkippedLine {
                        line_number,
                        line,
                        error: e,
                    });
                    continue;
                }
            };

            let start = Instant::now();
            let screened = evaluator.screen(record);
            report.metrics.record_verdict(&screened.verdict, start.elapsed());

            if screened.is_fraud() {
                let rules: Vec<&str> = screened
                    .verdict
                    .fired_rules()
                    .iter()
                    .map(|r| r.as_str())
                    .collect();
                warn!(
                    account = %screened.record.account_id,
                    location = %screened.record.location,
                    amount = screened.record.amount,
                    timestamp = %screened.record.formatted_timestamp,
                    rules = ?rules,
                    "Fraud alert"
                );
            }
            report.transactions.push(screened);
        }

        debug!(
            accounts = evaluator.account_count(),
            screened = report.transactions.len(),
            skipped = report.skipped.len(),
            "Batch finished"
        );

        report
    }
}

/// Lines of `reader` without their `\n` / `\r\n` terminator. Invalid UTF-8
/// is replaced with U+FFFD instead of failing the line.
fn lossy_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<String>> {
    reader.split(b'\n').map(|line| {
        line.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}
