//! Fraud verdicts and screened (decorated) transactions

use super::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three screening heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Amount above the absolute threshold
    OverThreshold,
    /// Amount far above the account's running mean
    RelativeAnomaly,
    /// Too many transactions inside the trailing window
    Velocity,
}

impl Rule {
    pub const ALL: [Rule; 3] = [Rule::OverThreshold, Rule::RelativeAnomaly, Rule::Velocity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::OverThreshold => "over_threshold",
            Rule::RelativeAnomaly => "relative_anomaly",
            Rule::Velocity => "velocity",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of every rule for one transaction.
///
/// All three outcomes are always computed; the transaction is fraudulent
/// when any of them fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub over_threshold: bool,
    pub relative_anomaly: bool,
    pub velocity: bool,
}

impl Verdict {
    pub fn is_fraud(&self) -> bool {
        self.over_threshold || self.relative_anomaly || self.velocity
    }

    pub fn fired(&self, rule: Rule) -> bool {
        match rule {
            Rule::OverThreshold => self.over_threshold,
            Rule::RelativeAnomaly => self.relative_anomaly,
            Rule::Velocity => self.velocity,
        }
    }

    /// Rules that fired, in evaluation order
    pub fn fired_rules(&self) -> Vec<Rule> {
        Rule::ALL.into_iter().filter(|r| self.fired(*r)).collect()
    }
}

/// A transaction decorated with its verdict, as handed to presentation
/// and export layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenedTransaction {
    pub record: TransactionRecord,
    pub verdict: Verdict,
}

impl ScreenedTransaction {
    pub fn new(record: TransactionRecord, verdict: Verdict) -> Self {
        Self { record, verdict }
    }

    pub fn is_fraud(&self) -> bool {
        self.verdict.is_fraud()
    }

    /// `YES` / `NO` rendering of the fraud flag
    pub fn fraud_label(&self) -> &'static str {
        if self.is_fraud() {
            "YES"
        } else {
            "NO"
        }
    }
}
