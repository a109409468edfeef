use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use uuid::Uuid;

use super::LedgerStore;
use crate::{Account, AccountId, EngineError, ResultEngine, Transaction};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: BTreeMap<AccountId, Account>,
    transactions: Vec<Transaction>,
    /// Remaining writes before every write fails. `None` never fails.
    writes_left: Option<usize>,
}

/// Ledger store kept in process memory.
///
/// Uses the sequential default [`LedgerStore::commit`]. Writes can be made
/// to fail with [`MemoryStore::fail_after`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `writes` more writes succeed, then fails every following one.
    /// `None` turns failures off.
    pub fn fail_after(&self, writes: Option<usize>) -> ResultEngine<()> {
        self.state()?.writes_left = writes;
        Ok(())
    }

    fn state(&self) -> ResultEngine<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| EngineError::Store("memory store poisoned".to_string()))
    }

    fn writable(&self) -> ResultEngine<MutexGuard<'_, MemoryState>> {
        let mut state = self.state()?;
        match state.writes_left {
            Some(0) => Err(EngineError::Store("injected write failure".to_string())),
            Some(left) => {
                state.writes_left = Some(left - 1);
                Ok(state)
            }
            None => Ok(state),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn accounts(&self) -> ResultEngine<Vec<Account>> {
        Ok(self.state()?.accounts.values().cloned().collect())
    }

    async fn transactions(&self) -> ResultEngine<Vec<Transaction>> {
        let mut transactions = self.state()?.transactions.clone();
        transactions.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));
        Ok(transactions)
    }

    async fn update_account_balance(
        &self,
        account_id: AccountId,
        balance: i64,
    ) -> ResultEngine<()> {
        let mut state = self.writable()?;
        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("account {account_id}")))?;
        account.balance = balance;
        Ok(())
    }

    async fn add_transaction(&self, tx: &Transaction) -> ResultEngine<()> {
        let mut state = self.writable()?;
        if state.transactions.iter().any(|t| t.id == tx.id) {
            return Err(EngineError::Store(format!("duplicate transaction {}", tx.id)));
        }
        state.transactions.push(tx.clone());
        Ok(())
    }

    async fn update_transaction(&self, tx: &Transaction) -> ResultEngine<()> {
        let mut state = self.writable()?;
        let stored = state
            .transactions
            .iter_mut()
            .find(|t| t.id == tx.id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("transaction {}", tx.id)))?;
        *stored = tx.clone();
        Ok(())
    }

    async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()> {
        let mut state = self.writable()?;
        let before = state.transactions.len();
        state.transactions.retain(|t| t.id != id);
        if state.transactions.len() == before {
            return Err(EngineError::KeyNotFound(format!("transaction {id}")));
        }
        Ok(())
    }

    async fn mark_transactions_settled(
        &self,
        ids: &[Uuid],
        settlement_id: Uuid,
    ) -> ResultEngine<()> {
        let mut state = self.writable()?;
        for tx in state.transactions.iter_mut().filter(|t| ids.contains(&t.id)) {
            tx.is_settled = true;
            tx.settlement_id = Some(settlement_id);
        }
        Ok(())
    }

    async fn mark_transactions_unsettled(&self, settlement_id: Uuid) -> ResultEngine<()> {
        let mut state = self.writable()?;
        for tx in state
            .transactions
            .iter_mut()
            .filter(|t| t.settlement_id == Some(settlement_id))
        {
            tx.is_settled = false;
            tx.settlement_id = None;
        }
        Ok(())
    }

    async fn seed_accounts_if_empty(&self, defaults: &[Account]) -> ResultEngine<bool> {
        let mut state = self.state()?;
        if !state.accounts.is_empty() {
            return Ok(false);
        }
        for account in defaults {
            state.accounts.insert(account.id, account.clone());
        }
        Ok(true)
    }

    async fn ensure_account_exists(&self, account: &Account) -> ResultEngine<()> {
        self.state()?
            .accounts
            .entry(account.id)
            .or_insert_with(|| account.clone());
        Ok(())
    }
}
