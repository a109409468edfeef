//! Persistence contract of the ledger.
//!
//! The engine only talks to storage through [`LedgerStore`]. Each logical
//! operation is described as a [`ChangeSet`] and handed to
//! [`LedgerStore::commit`] before the in-memory mirror is touched.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{Account, AccountId, ResultEngine, Transaction};

pub use memory::MemoryStore;
pub use sql::SqlStore;

mod memory;
mod sql;

/// A single write against the ledger store.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    SetBalance { account_id: AccountId, balance: i64 },
    Insert(Transaction),
    Update(Transaction),
    Delete(Uuid),
    MarkSettled { ids: Vec<Uuid>, settlement_id: Uuid },
    MarkUnsettled { settlement_id: Uuid },
}

/// Ordered writes of one logical operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) -> &mut Self {
        self.changes.push(change);
        self
    }

    pub fn set_balance(&mut self, account_id: AccountId, balance: i64) -> &mut Self {
        self.push(Change::SetBalance {
            account_id,
            balance,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Every stored account.
    async fn accounts(&self) -> ResultEngine<Vec<Account>>;

    /// Every stored transaction, newest first.
    async fn transactions(&self) -> ResultEngine<Vec<Transaction>>;

    async fn update_account_balance(&self, account_id: AccountId, balance: i64)
    -> ResultEngine<()>;

    async fn add_transaction(&self, tx: &Transaction) -> ResultEngine<()>;

    async fn update_transaction(&self, tx: &Transaction) -> ResultEngine<()>;

    async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()>;

    async fn mark_transactions_settled(&self, ids: &[Uuid], settlement_id: Uuid)
    -> ResultEngine<()>;

    /// Clears `is_settled` and `settlement_id` on everything closed by
    /// `settlement_id`.
    async fn mark_transactions_unsettled(&self, settlement_id: Uuid) -> ResultEngine<()>;

    /// Inserts `defaults` when no account exists yet. Returns `true` when it
    /// seeded.
    async fn seed_accounts_if_empty(&self, defaults: &[Account]) -> ResultEngine<bool>;

    /// Inserts `account` unless an account with the same id exists.
    async fn ensure_account_exists(&self, account: &Account) -> ResultEngine<()>;

    /// Applies `changes` in order.
    ///
    /// The default issues one call per change and stops at the first
    /// failure. Writes already made are not rolled back; stores with a
    /// native transaction should override this.
    async fn commit(&self, changes: &ChangeSet) -> ResultEngine<()> {
        for change in changes.iter() {
            match change {
                Change::SetBalance {
                    account_id,
                    balance,
                } => self.update_account_balance(*account_id, *balance).await?,
                Change::Insert(tx) => self.add_transaction(tx).await?,
                Change::Update(tx) => self.update_transaction(tx).await?,
                Change::Delete(id) => self.delete_transaction(*id).await?,
                Change::MarkSettled { ids, settlement_id } => {
                    self.mark_transactions_settled(ids, *settlement_id).await?
                }
                Change::MarkUnsettled { settlement_id } => {
                    self.mark_transactions_unsettled(*settlement_id).await?
                }
            }
        }
        Ok(())
    }
}
