//! Read-side views over the transaction log: filtered history and monthly
//! income/expense statistics.

use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    Engine, EngineError, LedgerStore, ResultEngine, SplitType, Transaction, TransactionKind,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryFilter {
    /// Everything the counterparty has a stake in.
    #[default]
    Counterparty,
    /// My own spending, transfers and income.
    Personal,
    /// Settlements only.
    Bills,
    All,
}

impl HistoryFilter {
    pub fn matches(self, tx: &Transaction) -> bool {
        let is_settlement = tx.kind == TransactionKind::Settlement;
        match self {
            Self::Counterparty => !is_settlement && tx.split.involves_counterparty(),
            Self::Personal => {
                !is_settlement
                    && (matches!(tx.split, SplitType::MeOnly | SplitType::Shared)
                        || matches!(tx.kind, TransactionKind::Transfer | TransactionKind::Income))
            }
            Self::Bills => is_settlement,
            Self::All => true,
        }
    }
}

impl TryFrom<&str> for HistoryFilter {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "counterparty" => Ok(Self::Counterparty),
            "personal" => Ok(Self::Personal),
            "bills" => Ok(Self::Bills),
            "all" => Ok(Self::All),
            other => Err(EngineError::InvalidTransaction(format!(
                "unknown history filter {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub day: u32,
    pub income: i64,
    pub expense: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub year: i32,
    pub month: u32,
    pub income: i64,
    pub expense: i64,
    /// One entry per calendar day, starting at day 1.
    pub days: Vec<DailyTotals>,
}

fn days_in_month(year: i32, month: u32) -> ResultEngine<u32> {
    let invalid = || EngineError::InvalidTransaction(format!("invalid month {year}-{month}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok(next.signed_duration_since(first).num_days() as u32)
}

/// Income and expense totals of `transactions` for one calendar month in
/// `tz`. Transfers and settlements are internal movements and not counted.
pub fn monthly_stats<'a, I>(
    transactions: I,
    year: i32,
    month: u32,
    tz: Tz,
) -> ResultEngine<MonthlyStats>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let days = days_in_month(year, month)?;
    let mut stats = MonthlyStats {
        year,
        month,
        income: 0,
        expense: 0,
        days: (1..=days)
            .map(|day| DailyTotals {
                day,
                ..DailyTotals::default()
            })
            .collect(),
    };

    for tx in transactions {
        let local = tx.occurred_at.with_timezone(&tz);
        if local.year() != year || local.month() != month {
            continue;
        }
        let Some(entry) = stats.days.get_mut(local.day0() as usize) else {
            continue;
        };
        match tx.kind {
            TransactionKind::Income => {
                entry.income += tx.amount_minor;
                stats.income += tx.amount_minor;
            }
            TransactionKind::Expense => {
                entry.expense += tx.amount_minor;
                stats.expense += tx.amount_minor;
            }
            TransactionKind::Transfer | TransactionKind::Settlement => {}
        }
    }

    Ok(stats)
}

impl<S: LedgerStore> Engine<S> {
    /// Transactions matching `filter`, newest first.
    pub fn history(&self, filter: HistoryFilter) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| filter.matches(t))
            .collect()
    }

    /// Statistics for a month, bucketed in the configured timezone.
    pub fn monthly_stats(&self, year: i32, month: u32) -> ResultEngine<MonthlyStats> {
        monthly_stats(&self.transactions, year, month, self.settings.timezone)
    }
}
