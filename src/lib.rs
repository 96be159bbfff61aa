//! Fraud Heuristics Screen Library
//!
//! Flags card transactions as suspicious with three cheap per-account
//! heuristics evaluated in a single ordered pass over a batch: an absolute
//! amount threshold, an anomaly check against the account's running mean,
//! and a velocity check over a trailing time window.

pub mod batch;
pub mod config;
pub mod evaluator;
pub mod export;
pub mod metrics;
pub mod parser;
pub mod types;

pub use batch::{BatchReport, BatchScreener};
pub use config::AppConfig;
pub use evaluator::{AccountState, FraudEvaluator, RuleThresholds};
pub use parser::{ParseError, RecordParser};
pub use types::{transaction::TransactionRecord, verdict::ScreenedTransaction, verdict::Verdict};
