//! Per-account fraud evaluator.
//!
//! Each record is judged against the history of its own account only.
//! Three rules run for every record, in this order, and the transaction is
//! flagged when any of them fires:
//!
//! 1. absolute threshold: `amount > amount_threshold`
//! 2. relative anomaly: `amount > anomaly_multiplier * mean(previous amounts)`
//! 3. velocity: at least `velocity_count` transactions within the trailing
//!    `velocity_window_ms`, counting the current one
//!
//! Rules 2 and 3 update the account state, so records must be fed in input
//! order and every rule runs even when an earlier one already fired.

use crate::types::transaction::TransactionRecord;
use crate::types::verdict::{ScreenedTransaction, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Rule parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Amounts strictly above this are always flagged
    pub amount_threshold: f64,
    /// Multiple of the account's mean amount that counts as anomalous
    pub anomaly_multiplier: f64,
    /// Length of the trailing velocity window in milliseconds
    pub velocity_window_ms: i64,
    /// Transactions within the window that trigger the velocity rule
    pub velocity_count: usize,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            amount_threshold: 5000.0,
            anomaly_multiplier: 5.0,
            velocity_window_ms: 60_000,
            velocity_count: 5,
        }
    }
}

/// Running statistics for one account.
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    /// Every amount seen, in arrival order
    amounts: Vec<f64>,
    /// Kahan running sum of `amounts` and its lost low-order bits
    total: f64,
    compensation: f64,
    /// Timestamps inside the trailing window of the latest one
    recent_timestamps: VecDeque<i64>,
}

impl AccountState {
    pub fn amounts(&self) -> &[f64] {
        &self.amounts
    }

    pub fn recent_timestamps(&self) -> &VecDeque<i64> {
        &self.recent_timestamps
    }

    /// Cumulative mean of all amounts so far, `None` before the first one.
    pub fn mean_amount(&self) -> Option<f64> {
        if self.amounts.is_empty() {
            None
        } else {
            Some((self.total - self.compensation) / self.amounts.len() as f64)
        }
    }

    fn record_amount(&mut self, amount: f64) {
        self.amounts.push(amount);
        let y = amount - self.compensation;
        let t = self.total + y;
        self.compensation = (t - self.total) - y;
        self.total = t;
    }

    /// Append `timestamp` and drop every entry at least `window_ms` older.
    ///
    /// Membership is relative to the appended timestamp, not wall clock.
    /// Entries newer than it (out-of-order input) are kept.
    fn record_timestamp(&mut self, timestamp: i64, window_ms: i64) -> usize {
        self.recent_timestamps.push_back(timestamp);
        self.recent_timestamps
            .retain(|&t| timestamp.saturating_sub(t) < window_ms);
        self.recent_timestamps.len()
    }
}

/// Stateful evaluator owning one [`AccountState`] per account.
///
/// Build a fresh evaluator (or call [`FraudEvaluator::reset`]) for each
/// independent batch: history carried over from a previous batch changes
/// the outcome of the relative-anomaly and velocity rules.
#[derive(Debug, Default)]
pub struct FraudEvaluator {
    thresholds: RuleThresholds,
    accounts: HashMap<String, AccountState>,
}

impl FraudEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: RuleThresholds) -> Self {
        Self {
            thresholds,
            accounts: HashMap::new(),
        }
    }

    pub fn thresholds(&self) -> &RuleThresholds {
        &self.thresholds
    }

    /// Judge one record and fold it into its account's history.
    pub fn evaluate(&mut self, record: &TransactionRecord) -> Verdict {
        let thresholds = &self.thresholds;
        let state = self
            .accounts
            .entry(record.account_id.clone())
            .or_default();

        let over_threshold = record.amount > thresholds.amount_threshold;

        let relative_anomaly = match state.mean_amount() {
            Some(mean) => record.amount > thresholds.anomaly_multiplier * mean,
            None => false,
        };
        state.record_amount(record.amount);

        let in_window = state.record_timestamp(record.timestamp, thresholds.velocity_window_ms);
        let velocity = in_window >= thresholds.velocity_count;

        let verdict = Verdict {
            over_threshold,
            relative_anomaly,
            velocity,
        };

        debug!(
            account = %record.account_id,
            amount = record.amount,
            timestamp = record.timestamp,
            in_window,
            fraud = verdict.is_fraud(),
            "Transaction evaluated"
        );

        verdict
    }

    /// Evaluate and decorate a record.
    pub fn screen(&mut self, record: TransactionRecord) -> ScreenedTransaction {
        let verdict = self.evaluate(&record);
        ScreenedTransaction::new(record, verdict)
    }

    pub fn account(&self, account_id: &str) -> Option<&AccountState> {
        self.accounts.get(account_id)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Forget all account history.
    pub fn reset(&mut self) {
        self.accounts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(account: &str, amount: f64, timestamp: i64) -> TransactionRecord {
        TransactionRecord::new(account, "NYC", amount, timestamp, "")
    }

    /// Records spaced far enough apart that velocity never fires
    fn spaced(account: &str, amounts: &[f64]) -> Vec<TransactionRecord> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, &a)| record(account, a, i as i64 * 120_000))
            .collect()
    }

    fn run(evaluator: &mut FraudEvaluator, records: &[TransactionRecord]) -> Vec<Verdict> {
        records.iter().map(|r| evaluator.evaluate(r)).collect()
    }

    #[test]
    fn test_large_amount_always_flagged() {
        let mut evaluator = FraudEvaluator::new();
        let verdict = evaluator.evaluate(&record("4111", 5000.01, 0));
        assert!(verdict.over_threshold);
        assert!(verdict.is_fraud());

        // regardless of a history of equally large amounts
        let mut evaluator = FraudEvaluator::new();
        for v in run(&mut evaluator, &spaced("4111", &[9000.0, 9000.0, 9000.0])) {
            assert!(v.is_fraud());
            assert!(!v.relative_anomaly);
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut evaluator = FraudEvaluator::new();
        assert!(!evaluator.evaluate(&record("4111", 5000.0, 0)).is_fraud());
    }

    #[test]
    fn test_first_transaction_not_flagged() {
        let mut evaluator = FraudEvaluator::new();
        let verdict = evaluator.evaluate(&record("4111", 4999.0, 0));
        assert_eq!(verdict, Verdict::default());
    }

    #[test]
    fn test_relative_anomaly() {
        let mut evaluator = FraudEvaluator::new();
        let verdicts = run(
            &mut evaluator,
            &spaced("4111", &[100.0, 100.0, 100.0, 100.0, 600.0]),
        );

        let flags: Vec<bool> = verdicts.iter().map(Verdict::is_fraud).collect();
        assert_eq!(flags, vec![false, false, false, false, true]);
        assert!(verdicts[4].relative_anomaly);
        assert!(!verdicts[4].velocity);
    }

    #[test]
    fn test_relative_anomaly_boundary() {
        // exactly 5x the mean does not fire
        let mut evaluator = FraudEvaluator::new();
        let verdicts = run(&mut evaluator, &spaced("4111", &[100.0, 500.0]));
        assert!(!verdicts[1].relative_anomaly);
    }

    #[test]
    fn test_mean_is_cumulative() {
        let mut evaluator = FraudEvaluator::new();
        run(&mut evaluator, &spaced("4111", &[100.0, 600.0, 200.0]));

        let state = evaluator.account("4111").unwrap();
        assert_eq!(state.amounts(), &[100.0, 600.0, 200.0]);
        assert_eq!(state.mean_amount(), Some(300.0));
    }

    #[test]
    fn test_exact_multiple_of_repeated_small_amounts() {
        // ten 0.1s sum naively to 0.9999999999999999, which would make
        // 0.5 look like more than 5x the mean
        let mut amounts = vec![0.1; 10];
        amounts.push(0.5);
        let records = spaced("4111", &amounts);

        let mut evaluator = FraudEvaluator::new();
        run(&mut evaluator, &records[..10]);
        assert_eq!(evaluator.account("4111").unwrap().mean_amount(), Some(0.1));

        let verdict = evaluator.evaluate(&records[10]);
        assert!(!verdict.relative_anomaly);
        assert!(!verdict.is_fraud());
    }

    #[test]
    fn test_flagged_amount_still_joins_history() {
        let mut evaluator = FraudEvaluator::new();
        let verdicts = run(&mut evaluator, &spaced("4111", &[10.0, 1000.0, 1000.0]));

        assert!(verdicts[1].relative_anomaly);
        // mean is now 505, so a second 1000 is ordinary
        assert!(!verdicts[2].relative_anomaly);
    }

    #[test]
    fn test_velocity_rule() {
        let mut evaluator = FraudEvaluator::new();
        let records: Vec<_> = [0, 10_000, 20_000, 30_000, 40_000]
            .iter()
            .map(|&t| record("4111", 50.0, t))
            .collect();

        let verdicts = run(&mut evaluator, &records);
        let flags: Vec<bool> = verdicts.iter().map(Verdict::is_fraud).collect();
        assert_eq!(flags, vec![false, false, false, false, true]);
        assert!(verdicts[4].velocity);
        assert!(!verdicts[4].relative_anomaly);
    }

    #[test]
    fn test_velocity_window_is_open() {
        let mut evaluator = FraudEvaluator::new();
        let records: Vec<_> = [0, 15_000, 30_000, 45_000, 60_000]
            .iter()
            .map(|&t| record("4111", 50.0, t))
            .collect();

        let verdicts = run(&mut evaluator, &records);
        // t=0 is exactly 60s before t=60000 and falls out of the window
        assert!(!verdicts[4].velocity);
        assert_eq!(
            evaluator.account("4111").unwrap().recent_timestamps(),
            &VecDeque::from(vec![15_000, 30_000, 45_000, 60_000])
        );
    }

    #[test]
    fn test_velocity_prunes_out_of_order_entries() {
        let mut evaluator = FraudEvaluator::new();
        for t in [100_000, 10_000, 110_000] {
            evaluator.evaluate(&record("4111", 50.0, t));
        }

        // 10_000 sits behind 100_000 but is still pruned once 110_000 arrives
        let state = evaluator.account("4111").unwrap();
        assert_eq!(state.recent_timestamps(), &VecDeque::from(vec![100_000, 110_000]));
    }

    #[test]
    fn test_velocity_keeps_future_entries() {
        let mut evaluator = FraudEvaluator::new();
        for t in [200_000, 0] {
            evaluator.evaluate(&record("4111", 50.0, t));
        }

        let state = evaluator.account("4111").unwrap();
        assert_eq!(state.recent_timestamps(), &VecDeque::from(vec![200_000, 0]));
    }

    #[test]
    fn test_accounts_are_independent() {
        let mut evaluator = FraudEvaluator::new();
        for (i, account) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            let verdict = evaluator.evaluate(&record(account, 50.0, i as i64 * 1000));
            assert!(!verdict.is_fraud());
        }
        assert_eq!(evaluator.account_count(), 5);

        // a small history on one account does not inform another
        let verdict = evaluator.evaluate(&record("f", 4000.0, 6000));
        assert!(!verdict.relative_anomaly);
    }

    #[test]
    fn test_all_rules_evaluated_together() {
        let mut evaluator = FraudEvaluator::new();
        for t in [0, 1000, 2000, 3000] {
            evaluator.evaluate(&record("4111", 100.0, t));
        }

        let verdict = evaluator.evaluate(&record("4111", 6000.0, 4000));
        assert!(verdict.over_threshold);
        assert!(verdict.relative_anomaly);
        assert!(verdict.velocity);

        let state = evaluator.account("4111").unwrap();
        assert_eq!(state.amounts().len(), 5);
        assert_eq!(state.recent_timestamps().len(), 5);
    }

    #[test]
    fn test_deterministic_for_fresh_state() {
        let records: Vec<_> = [100.0, 100.0, 700.0, 50.0, 9000.0]
            .iter()
            .enumerate()
            .map(|(i, &a)| record("4111", a, i as i64 * 5000))
            .collect();

        let first = run(&mut FraudEvaluator::new(), &records);
        let second = run(&mut FraudEvaluator::new(), &records);
        assert_eq!(first, second);
    }

    #[test]
    fn test_refeeding_without_reset_changes_outcome() {
        let records: Vec<_> = [0, 10_000, 20_000]
            .iter()
            .map(|&t| record("4111", 100.0, t))
            .collect();

        let mut evaluator = FraudEvaluator::new();
        let first = run(&mut evaluator, &records);
        assert!(first.iter().all(|v| !v.is_fraud()));

        // the second pass sees the first pass's timestamps in its window
        let second = run(&mut evaluator, &records);
        assert!(second.iter().any(Verdict::is_fraud));

        evaluator.reset();
        assert_eq!(evaluator.account_count(), 0);
        assert_eq!(run(&mut evaluator, &records), first);
    }

    #[test]
    fn test_custom_thresholds() {
        let mut evaluator = FraudEvaluator::with_thresholds(RuleThresholds {
            amount_threshold: 100.0,
            anomaly_multiplier: 2.0,
            velocity_window_ms: 1000,
            velocity_count: 2,
        });

        assert!(evaluator.evaluate(&record("4111", 150.0, 0)).over_threshold);
        let verdict = evaluator.evaluate(&record("4111", 20.0, 500));
        assert!(verdict.velocity);
        assert!(!verdict.relative_anomaly);
    }

    #[test]
    fn test_screen_decorates_record() {
        let mut evaluator = FraudEvaluator::new();
        let screened = evaluator.screen(record("4111", 7500.0, 0));

        assert_eq!(screened.record.account_id, "4111");
        assert!(screened.is_fraud());
        assert_eq!(screened.fraud_label(), "YES");
    }
}
