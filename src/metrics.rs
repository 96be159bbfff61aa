//! Run statistics for a screened batch.

use crate::parser::ParseError;
use crate::types::verdict::{Rule, Verdict};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

/// Evaluation timings kept for percentiles; older half is dropped past this
const MAX_TIMING_SAMPLES: usize = 100_000;

/// Metrics collector for one batch
#[derive(Debug, Default)]
pub struct BatchMetrics {
    /// Lines read from the source, including skipped ones
    lines_read: u64,
    /// Records that reached the evaluator
    transactions_screened: u64,
    /// Records flagged as fraud
    transactions_flagged: u64,
    /// Rejected lines by reason
    skipped_by_reason: BTreeMap<&'static str, u64>,
    /// How often each rule fired
    rule_hits: BTreeMap<Rule, u64>,
    /// Evaluation times (in nanoseconds)
    evaluation_times: Vec<u64>,
}

impl BatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&mut self) {
        self.lines_read += 1;
    }

    pub fn record_skip(&mut self, error: &ParseError) {
        *self.skipped_by_reason.entry(error.kind()).or_insert(0) += 1;
    }

    pub fn record_verdict(&mut self, verdict: &Verdict, elapsed: Duration) {
        self.transactions_screened += 1;
        self.evaluation_times.push(elapsed.as_nanos() as u64);
        if self.evaluation_times.len() > MAX_TIMING_SAMPLES {
            self.evaluation_times.drain(0..MAX_TIMING_SAMPLES / 2);
        }

        if verdict.is_fraud() {
            self.transactions_flagged += 1;
        }
        for rule in verdict.fired_rules() {
            *self.rule_hits.entry(rule).or_insert(0) += 1;
        }
    }

    pub fn transactions_screened(&self) -> u64 {
        self.transactions_screened
    }

    pub fn transactions_flagged(&self) -> u64 {
        self.transactions_flagged
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_by_reason.values().sum()
    }

    pub fn rule_hits(&self, rule: Rule) -> u64 {
        self.rule_hits.get(&rule).copied().unwrap_or(0)
    }

    /// Evaluation latency statistics
    pub fn get_evaluation_stats(&self) -> EvaluationStats {
        if self.evaluation_times.is_empty() {
            return EvaluationStats::default();
        }

        let mut sorted = self.evaluation_times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        EvaluationStats {
            count: count as u64,
            mean_ns: sum / count as u64,
            p50_ns: sorted[count / 2],
            p95_ns: sorted[(count as f64 * 0.95) as usize],
            p99_ns: sorted[(count as f64 * 0.99) as usize],
            max_ns: sorted[count - 1],
        }
    }

    /// Serializable snapshot of the run
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            lines_read: self.lines_read,
            transactions_screened: self.transactions_screened,
            transactions_flagged: self.transactions_flagged,
            skipped: self.skipped_by_reason.clone(),
            rule_hits: Rule::ALL
                .into_iter()
                .map(|r| (r.as_str(), self.rule_hits(r)))
                .collect(),
            evaluation: self.get_evaluation_stats(),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let flag_rate = if self.transactions_screened > 0 {
            (self.transactions_flagged as f64 / self.transactions_screened as f64) * 100.0
        } else {
            0.0
        };
        let stats = self.get_evaluation_stats();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║               FRAUD SCREEN - BATCH SUMMARY                   ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Lines Read: {:>8}  │  Skipped: {:>8}                    ║",
            self.lines_read,
            self.skipped()
        );
        info!(
            "║ Screened:   {:>8}  │  Flagged: {:>8} ({:>5.1}%)          ║",
            self.transactions_screened, self.transactions_flagged, flag_rate
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Evaluation Time (ns): mean={:>6} p50={:>6} p99={:>6}        ║",
            stats.mean_ns, stats.p50_ns, stats.p99_ns
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Rule Hits:                                                   ║");
        for rule in Rule::ALL {
            info!("║   {:17}: {:>8}                                 ║", rule.as_str(), self.rule_hits(rule));
        }
        if !self.skipped_by_reason.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Skipped Lines:                                               ║");
            for (reason, count) in &self.skipped_by_reason {
                info!("║   {:17}: {:>8}                                 ║", reason, count);
            }
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

/// Evaluation time statistics
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct EvaluationStats {
    pub count: u64,
    pub mean_ns: u64,
    pub p50_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub max_ns: u64,
}

/// Snapshot of a finished batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub lines_read: u64,
    pub transactions_screened: u64,
    pub transactions_flagged: u64,
    pub skipped: BTreeMap<&'static str, u64>,
    pub rule_hits: BTreeMap<&'static str, u64>,
    pub evaluation: EvaluationStats,
}
