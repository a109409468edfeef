//! CSV export of the transaction history.

use std::io::Write;

use chrono_tz::Tz;
use csv::Writer;
use engine::Transaction;
use serde::Serialize;

#[derive(Serialize)]
struct ExportRow<'a> {
    id: String,
    occurred_at: String,
    description: &'a str,
    amount_minor: i64,
    account: &'static str,
    to_account: Option<&'static str>,
    kind: &'static str,
    split: &'static str,
    is_settled: bool,
    settlement_id: Option<String>,
}

/// Writes one row per transaction, dates in `tz`.
pub fn write_csv<'a, W, I>(out: W, transactions: I, tz: Tz) -> Result<(), csv::Error>
where
    W: Write,
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut writer = Writer::from_writer(out);
    for tx in transactions {
        writer.serialize(ExportRow {
            id: tx.id.to_string(),
            occurred_at: tx.occurred_at.with_timezone(&tz).to_rfc3339(),
            description: &tx.description,
            amount_minor: tx.amount_minor,
            account: tx.account_id.as_str(),
            to_account: tx.to_account_id.map(|id| id.as_str()),
            kind: tx.kind.as_str(),
            split: tx.split.as_str(),
            is_settled: tx.is_settled,
            settlement_id: tx.settlement_id.map(|id| id.to_string()),
        })?;
    }
    writer.flush()?;
    Ok(())
}
