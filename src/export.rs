//! Flagged-transaction CSV output

use crate::types::verdict::ScreenedTransaction;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub const FLAGGED_HEADER: [&str; 5] = ["Card Number", "Location", "Amount ($)", "Timestamp", "Fraud"];

/// Render an amount with at least one fractional digit (`100.0`, `5000.5`).
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.1}", amount)
    } else {
        amount.to_string()
    }
}

/// Write the header and one `YES` row per flagged transaction.
///
/// Returns the number of rows written.
pub fn write_flagged<'a, W, I>(writer: W, transactions: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a ScreenedTransaction>,
{
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(FLAGGED_HEADER)?;

    let mut rows = 0;
    for tx in transactions.into_iter().filter(|t| t.is_fraud()) {
        let record = &tx.record;
        csv_writer.write_record([
            record.account_id.as_str(),
            record.location.as_str(),
            format_amount(record.amount).as_str(),
            record.formatted_timestamp.as_str(),
            tx.fraud_label(),
        ])?;
        rows += 1;
    }

    csv_writer.flush()?;
    Ok(rows)
}

/// Write the flagged subset to `path`, replacing any existing file.
pub fn save_flagged<'a, P, I>(path: P, transactions: I) -> Result<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a ScreenedTransaction>,
{
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let rows = write_flagged(file, transactions)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), rows, "Saved fraudulent transactions");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::TransactionRecord;
    use crate::types::verdict::Verdict;

    fn screened(account: &str, amount: f64, fraud: bool) -> ScreenedTransaction {
        ScreenedTransaction::new(
            TransactionRecord::new(account, "NYC", amount, 0, "1970-01-01 00:00:00"),
            Verdict {
                over_threshold: fraud,
                ..Verdict::default()
            },
        )
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(100.0), "100.0");
        assert_eq!(format_amount(5000.5), "5000.5");
        assert_eq!(format_amount(0.0), "0.0");
        // plain notation even for large amounts
        assert_eq!(format_amount(12_000_000.0), "12000000.0");
        assert_eq!(format_amount(12_345_678.5), "12345678.5");
    }

    #[test]
    fn test_only_flagged_rows_written() {
        let transactions = vec![
            screened("1", 10.0, false),
            screened("2", 9000.0, true),
            screened("3", 20.0, false),
            screened("4", 7000.25, true),
        ];

        let mut out = Vec::new();
        let rows = write_flagged(&mut out, &transactions).unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Card Number,Location,Amount ($),Timestamp,Fraud\n\
             2,NYC,9000.0,1970-01-01 00:00:00,YES\n\
             4,NYC,7000.25,1970-01-01 00:00:00,YES\n"
        );
    }

    #[test]
    fn test_empty_batch_writes_header() {
        let mut out = Vec::new();
        let rows = write_flagged(&mut out, &Vec::new()).unwrap();

        assert_eq!(rows, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Card Number,Location,Amount ($),Timestamp,Fraud\n"
        );
    }

    #[test]
    fn test_unwritable_path() {
        let transactions = vec![screened("1", 9000.0, true)];
        assert!(save_flagged("/nonexistent-dir/flagged.csv", &transactions).is_err());
    }
}
