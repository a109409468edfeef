//! Transaction primitives.
//!
//! A `Transaction` is a dated movement of money. Who paid for what is carried
//! by its [`TransactionKind`] and [`SplitType`], never by the sign of the
//! amount, which is always positive.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AccountId, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Income,
    Transfer,
    Settlement,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
            Self::Settlement => "settlement",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            "settlement" => Ok(Self::Settlement),
            other => Err(EngineError::InvalidTransaction(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// How an amount is attributed between the owner and the counterparty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    /// Paid by me, used by me.
    MeOnly,
    /// Paid by me, used by the counterparty.
    CounterpartyOnly,
    /// Paid by me, shared 50/50.
    Shared,
    /// Paid by the counterparty.
    CounterpartyPaid,
}

impl SplitType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MeOnly => "me_only",
            Self::CounterpartyOnly => "counterparty_only",
            Self::Shared => "shared",
            Self::CounterpartyPaid => "counterparty_paid",
        }
    }

    /// Splits that involve the counterparty and therefore end up on a bill.
    pub fn involves_counterparty(self) -> bool {
        match self {
            Self::CounterpartyOnly | Self::Shared | Self::CounterpartyPaid => true,
            Self::MeOnly => false,
        }
    }
}

impl TryFrom<&str> for SplitType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "me_only" => Ok(Self::MeOnly),
            "counterparty_only" => Ok(Self::CounterpartyOnly),
            "shared" => Ok(Self::Shared),
            "counterparty_paid" => Ok(Self::CounterpartyPaid),
            other => Err(EngineError::InvalidTransaction(format!(
                "invalid split type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Time-ordered (v7) so ids sort in creation order.
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub description: String,
    pub amount_minor: i64,
    pub account_id: AccountId,
    /// Destination account, only for transfers.
    pub to_account_id: Option<AccountId>,
    pub kind: TransactionKind,
    pub split: SplitType,
    pub is_settled: bool,
    /// The settlement that closed this transaction.
    pub settlement_id: Option<Uuid>,
    /// Set on carry-forward entries: the settlement whose residual they hold.
    pub carried_from: Option<Uuid>,
}

impl Transaction {
    /// Settled and not reversible on its own: only deleting the owning
    /// settlement unlocks it.
    pub fn is_locked(&self) -> bool {
        self.is_settled
            && !matches!(
                self.kind,
                TransactionKind::Settlement | TransactionKind::Income
            )
    }

    /// Open item that takes part in the debt computation.
    pub fn is_open_item(&self) -> bool {
        !self.is_settled
            && !matches!(
                self.kind,
                TransactionKind::Transfer | TransactionKind::Settlement
            )
    }

    /// Bookkeeping-only entry seeded by a settlement.
    pub fn is_carry_forward(&self) -> bool {
        self.carried_from.is_some()
    }
}

/// Input for creating a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub kind: TransactionKind,
    pub split: SplitType,
    pub amount_minor: i64,
    pub description: String,
    pub account_id: AccountId,
    pub to_account_id: Option<AccountId>,
    pub occurred_at: DateTime<Utc>,
}

impl TransactionDraft {
    pub fn expense(
        amount_minor: i64,
        description: &str,
        account_id: AccountId,
        split: SplitType,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: TransactionKind::Expense,
            split,
            amount_minor,
            description: description.to_string(),
            account_id,
            to_account_id: None,
            occurred_at,
        }
    }

    /// Plain income, attributed to me.
    pub fn income(
        amount_minor: i64,
        description: &str,
        account_id: AccountId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: TransactionKind::Income,
            split: SplitType::MeOnly,
            amount_minor,
            description: description.to_string(),
            account_id,
            to_account_id: None,
            occurred_at,
        }
    }

    pub fn transfer(
        amount_minor: i64,
        description: &str,
        from: AccountId,
        to: AccountId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: TransactionKind::Transfer,
            split: SplitType::MeOnly,
            amount_minor,
            description: description.to_string(),
            account_id: from,
            to_account_id: Some(to),
            occurred_at,
        }
    }

    pub(crate) fn validate(&self) -> ResultEngine<()> {
        validate_amount(self.amount_minor)?;
        validate_description(&self.description)?;
        match (self.kind, self.to_account_id) {
            (TransactionKind::Settlement, _) => Err(EngineError::InvalidTransaction(
                "settlements are created by settling a bill".to_string(),
            )),
            (TransactionKind::Transfer, None) => Err(EngineError::InvalidTransaction(
                "a transfer needs a destination account".to_string(),
            )),
            (TransactionKind::Transfer, Some(to)) if to == self.account_id => {
                Err(EngineError::InvalidTransaction(
                    "source and destination accounts must differ".to_string(),
                ))
            }
            (TransactionKind::Expense | TransactionKind::Income, Some(_)) => {
                Err(EngineError::InvalidTransaction(
                    "only transfers have a destination account".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Builds the transaction in its initial settled state: transfers and
    /// plain income are settled on creation, expenses and counterparty
    /// deposits stay open for the next bill.
    pub(crate) fn into_transaction(self) -> Transaction {
        let is_settled = match self.kind {
            TransactionKind::Expense => false,
            TransactionKind::Income => self.split != SplitType::CounterpartyPaid,
            TransactionKind::Transfer | TransactionKind::Settlement => true,
        };
        Transaction {
            id: Uuid::now_v7(),
            occurred_at: self.occurred_at,
            description: self.description.trim().to_string(),
            amount_minor: self.amount_minor,
            account_id: self.account_id,
            to_account_id: self.to_account_id,
            kind: self.kind,
            split: self.split,
            is_settled,
            settlement_id: None,
            carried_from: None,
        }
    }
}

/// New values for an existing transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEdit {
    pub amount_minor: i64,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

pub(crate) fn validate_amount(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "amount_minor must be > 0".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_description(description: &str) -> ResultEngine<()> {
    if description.trim().is_empty() {
        return Err(EngineError::InvalidTransaction(
            "description must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub occurred_at: DateTimeUtc,
    pub description: String,
    pub amount_minor: i64,
    pub account_id: String,
    pub to_account_id: Option<String>,
    pub kind: String,
    pub split: String,
    pub is_settled: bool,
    pub settlement_id: Option<String>,
    pub carried_from: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            description: ActiveValue::Set(tx.description.clone()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            account_id: ActiveValue::Set(tx.account_id.as_str().to_string()),
            to_account_id: ActiveValue::Set(tx.to_account_id.map(|id| id.as_str().to_string())),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            split: ActiveValue::Set(tx.split.as_str().to_string()),
            is_settled: ActiveValue::Set(tx.is_settled),
            settlement_id: ActiveValue::Set(tx.settlement_id.map(|id| id.to_string())),
            carried_from: ActiveValue::Set(tx.carried_from.map(|id| id.to_string())),
        }
    }
}

fn parse_uuid(value: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| EngineError::InvalidTransaction(format!("invalid id: {value}")))
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id)?,
            occurred_at: model.occurred_at,
            description: model.description,
            amount_minor: model.amount_minor,
            account_id: AccountId::try_from(model.account_id.as_str())?,
            to_account_id: model
                .to_account_id
                .as_deref()
                .map(AccountId::try_from)
                .transpose()?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            split: SplitType::try_from(model.split.as_str())?,
            is_settled: model.is_settled,
            settlement_id: model.settlement_id.as_deref().map(parse_uuid).transpose()?,
            carried_from: model.carried_from.as_deref().map(parse_uuid).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn initial_settled_state_follows_kind() {
        let expense =
            TransactionDraft::expense(100, "Lunch", AccountId::Cash, SplitType::Shared, at())
                .into_transaction();
        assert!(!expense.is_settled);

        let income = TransactionDraft::income(100, "Salary", AccountId::PrimaryBank, at())
            .into_transaction();
        assert!(income.is_settled);

        let mut deposit = TransactionDraft::income(100, "Fund", AccountId::PrimaryBank, at());
        deposit.split = SplitType::CounterpartyPaid;
        assert!(!deposit.into_transaction().is_settled);

        let transfer = TransactionDraft::transfer(
            100,
            "Move",
            AccountId::PrimaryBank,
            AccountId::Cash,
            at(),
        )
        .into_transaction();
        assert!(transfer.is_settled);
    }

    #[test]
    fn validate_rejects_bad_drafts() {
        let zero = TransactionDraft::expense(0, "x", AccountId::Cash, SplitType::MeOnly, at());
        assert!(matches!(zero.validate(), Err(EngineError::InvalidAmount(_))));

        let blank = TransactionDraft::expense(10, "  ", AccountId::Cash, SplitType::MeOnly, at());
        assert!(matches!(
            blank.validate(),
            Err(EngineError::InvalidTransaction(_))
        ));

        let same = TransactionDraft::transfer(10, "x", AccountId::Cash, AccountId::Cash, at());
        assert!(same.validate().is_err());

        let mut settlement =
            TransactionDraft::income(10, "x", AccountId::PrimaryBank, at());
        settlement.kind = TransactionKind::Settlement;
        assert!(settlement.validate().is_err());
    }

    #[test]
    fn lock_applies_to_settled_expenses_only() {
        let mut tx =
            TransactionDraft::expense(100, "Lunch", AccountId::Cash, SplitType::Shared, at())
                .into_transaction();
        assert!(!tx.is_locked());
        tx.is_settled = true;
        assert!(tx.is_locked());
        tx.kind = TransactionKind::Income;
        assert!(!tx.is_locked());
        tx.kind = TransactionKind::Settlement;
        assert!(!tx.is_locked());
    }

    #[test]
    fn model_round_trip_keeps_links() {
        let mut tx = TransactionDraft::transfer(
            5_000,
            "Move",
            AccountId::Cash,
            AccountId::EarmarkedSavings,
            at(),
        )
        .into_transaction();
        tx.settlement_id = Some(Uuid::now_v7());

        let active = ActiveModel::from(&tx);
        let model = Model {
            id: active.id.unwrap(),
            occurred_at: active.occurred_at.unwrap(),
            description: active.description.unwrap(),
            amount_minor: active.amount_minor.unwrap(),
            account_id: active.account_id.unwrap(),
            to_account_id: active.to_account_id.unwrap(),
            kind: active.kind.unwrap(),
            split: active.split.unwrap(),
            is_settled: active.is_settled.unwrap(),
            settlement_id: active.settlement_id.unwrap(),
            carried_from: active.carried_from.unwrap(),
        };
        assert_eq!(Transaction::try_from(model).unwrap(), tx);
    }
}
