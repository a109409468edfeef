//! The module contains the `Account` struct and the closed set of account ids.

use std::fmt;

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Identifier of one of the fixed ledger accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountId {
    Cash,
    PrimaryBank,
    SecondaryBank,
    Savings,
    /// Ring-fenced label over part of the [`AccountId::PrimaryBank`] money.
    EarmarkedSavings,
}

impl AccountId {
    pub const ALL: [AccountId; 5] = [
        AccountId::Cash,
        AccountId::PrimaryBank,
        AccountId::SecondaryBank,
        AccountId::Savings,
        AccountId::EarmarkedSavings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::PrimaryBank => "PRIMARY_BANK",
            Self::SecondaryBank => "SECONDARY_BANK",
            Self::Savings => "SAVINGS",
            Self::EarmarkedSavings => "EARMARKED_SAVINGS",
        }
    }

    /// The bank account whose real balance this account is a subset of.
    pub fn paired_bank(self) -> Option<AccountId> {
        match self {
            Self::EarmarkedSavings => Some(Self::PrimaryBank),
            Self::Cash | Self::PrimaryBank | Self::SecondaryBank | Self::Savings => None,
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AccountId {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(Self::Cash),
            "PRIMARY_BANK" => Ok(Self::PrimaryBank),
            "SECONDARY_BANK" => Ok(Self::SecondaryBank),
            "SAVINGS" => Ok(Self::Savings),
            "EARMARKED_SAVINGS" => Ok(Self::EarmarkedSavings),
            other => Err(EngineError::InvalidTransaction(format!("unknown account {other}"))),
        }
    }
}

/// An account.
///
/// A place where money is kept: a wallet, a bank account or a savings pot.
/// Only `balance` carries ledger meaning, the rest is presentation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub balance: i64,
}

impl Account {
    pub fn new(id: AccountId, name: &str, color: &str, icon: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            color: color.to_string(),
            icon: icon.to_string(),
            balance: 0,
        }
    }

    pub fn with_balance(mut self, balance: i64) -> Self {
        self.balance = balance;
        self
    }
}

/// Accounts seeded on first run, all starting from zero.
pub fn default_accounts() -> Vec<Account> {
    vec![
        Account::new(AccountId::Cash, "Cash", "green", "payments"),
        Account::new(AccountId::PrimaryBank, "Primary bank (available)", "blue", "account_balance"),
        Account::new(AccountId::SecondaryBank, "Secondary bank", "red", "credit_card"),
        Account::new(AccountId::Savings, "Savings", "purple", "savings"),
        Account::new(AccountId::EarmarkedSavings, "Holiday savings", "pink", "celebration"),
    ]
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub balance: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.as_str().to_string()),
            name: ActiveValue::Set(value.name.clone()),
            color: ActiveValue::Set(value.color.clone()),
            icon: ActiveValue::Set(value.icon.clone()),
            balance: ActiveValue::Set(value.balance),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: AccountId::try_from(model.id.as_str())?,
            name: model.name,
            color: model.color,
            icon: model.icon,
            balance: model.balance,
        })
    }
}
