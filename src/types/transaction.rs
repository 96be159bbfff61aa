//! Transaction record data structures

use serde::{Deserialize, Serialize};

/// A validated card transaction, as produced by the record parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Card number / account identifier (never empty)
    pub account_id: String,

    /// Free-form location of the transaction
    pub location: String,

    /// Transaction amount (finite, non-negative)
    pub amount: f64,

    /// Epoch milliseconds
    pub timestamp: i64,

    /// `YYYY-MM-DD HH:mm:ss` rendering of `timestamp`, display only
    pub formatted_timestamp: String,
}

impl TransactionRecord {
    /// Create a record with an already formatted display timestamp.
    pub fn new(
        account_id: impl Into<String>,
        location: impl Into<String>,
        amount: f64,
        timestamp: i64,
        formatted_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            location: location.into(),
            amount,
            timestamp,
            formatted_timestamp: formatted_timestamp.into(),
        }
    }
}
