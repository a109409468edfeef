use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one of the fixed ledger accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountId {
    Cash,
    PrimaryBank,
    SecondaryBank,
    Savings,
    EarmarkedSavings,
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: AccountId,
        pub name: String,
        pub color: String,
        pub icon: String,
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountsResponse {
        pub accounts: Vec<AccountView>,
        pub total_balance_minor: i64,
    }

    /// Manual override of an account balance.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceUpdate {
        pub balance_minor: i64,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Expense,
        Income,
        Transfer,
        Settlement,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SplitType {
        MeOnly,
        CounterpartyOnly,
        Shared,
        CounterpartyPaid,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum HistoryFilter {
        #[default]
        Counterparty,
        Personal,
        Bills,
        All,
    }

    /// Query string of `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub filter: Option<HistoryFilter>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        /// RFC3339 timestamp in the ledger timezone.
        pub occurred_at: DateTime<FixedOffset>,
        pub description: String,
        pub amount_minor: i64,
        pub account_id: AccountId,
        pub to_account_id: Option<AccountId>,
        pub kind: TransactionKind,
        pub split: SplitType,
        pub is_settled: bool,
        pub settlement_id: Option<Uuid>,
        pub carried_from: Option<Uuid>,
        /// Settled and therefore neither deletable nor re-priceable.
        pub locked: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: TransactionKind,
        /// Defaults to `me_only`.
        pub split: Option<SplitType>,
        pub amount_minor: i64,
        pub description: String,
        pub account_id: AccountId,
        /// Required for transfers only.
        pub to_account_id: Option<AccountId>,
        /// Defaults to now.
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    /// Full replacement of the editable fields.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub amount_minor: i64,
        pub description: String,
        pub occurred_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub amount_minor: i64,
        pub from: AccountId,
        pub to: AccountId,
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DepositNew {
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub id: Uuid,
    }
}

pub mod settlement {
    use super::*;
    use crate::transaction::TransactionView;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtView {
        pub counterparty_name: String,
        /// Positive: the counterparty owes. Negative: credit.
        pub net_debt_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BillView {
        pub items: Vec<TransactionView>,
        pub net_debt_minor: i64,
        pub suggested_payment_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementNew {
        pub final_payment_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementCreated {
        pub settlement_id: Uuid,
        pub settlement: Option<TransactionView>,
        pub carry_forward: Option<TransactionView>,
        pub settled_ids: Vec<Uuid>,
        pub surplus_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementViewResponse {
        pub settlement_id: Uuid,
        pub settlement: Option<TransactionView>,
        pub items: Vec<TransactionView>,
        pub items_total_minor: i64,
        pub amount_paid_minor: i64,
        pub carry_forward: Option<TransactionView>,
    }
}

pub mod stats {
    use super::*;

    /// Query string of `GET /stats`. Missing fields default to the current
    /// month.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct StatsQuery {
        pub year: Option<i32>,
        pub month: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DailyStat {
        pub day: u32,
        pub income_minor: i64,
        pub expense_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlyStatistic {
        pub year: i32,
        pub month: u32,
        pub income_minor: i64,
        pub expense_minor: i64,
        pub days: Vec<DailyStat>,
    }
}
