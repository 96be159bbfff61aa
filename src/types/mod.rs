//! Type definitions for the fraud screen

pub mod transaction;
pub mod verdict;

pub use transaction::TransactionRecord;
pub use verdict::{Rule, ScreenedTransaction, Verdict};
