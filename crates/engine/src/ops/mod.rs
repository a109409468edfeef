use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{
    AccountId, ChangeSet, Engine, EngineError, LedgerStore, Money, ResultEngine, Transaction,
    net_debt,
};

mod lifecycle;
mod settlement;

pub use settlement::{Bill, SettlementOutcome, SettlementView};

impl<S: LedgerStore> Engine<S> {
    fn transaction_index(&self, id: Uuid) -> ResultEngine<usize> {
        self.transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("transaction {id}")))
    }

    /// Hands `changes` to the store. Nothing in memory is touched here.
    async fn commit(&self, operation: &'static str, changes: &ChangeSet) -> ResultEngine<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.store.commit(changes).await.inspect_err(|err| {
            tracing::error!(operation, error = %err, "ledger store write failed");
        })
    }

    fn apply_balances_to_memory(&mut self, balances: &BTreeMap<AccountId, i64>) {
        for (account_id, balance) in balances {
            if let Some(account) = self.accounts.get_mut(account_id) {
                account.balance = *balance;
            }
        }
    }

    /// Fails unless the total balance stays in range once `balances` are
    /// applied.
    fn ensure_total_in_range(&self, balances: &BTreeMap<AccountId, i64>) -> ResultEngine<()> {
        self.accounts
            .values()
            .map(|a| balances.get(&a.id).copied().unwrap_or(a.balance))
            .try_fold(Money::new(0), |acc, b| acc.checked_add(Money::new(b)))
            .map(|_| ())
            .ok_or_else(|| EngineError::InvalidAmount("total balance out of range".to_string()))
    }

    /// Fails unless the net debt over `transactions` stays in range.
    fn ensure_debt_in_range<'a, I>(&self, transactions: I) -> ResultEngine<()>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        net_debt(transactions, self.settings.base_fee).map(|_| ())
    }

    /// Inserts keeping the newest-first order the store returns.
    fn insert_into_memory(&mut self, tx: Transaction) {
        let at = self
            .transactions
            .partition_point(|t| (t.occurred_at, t.id) > (tx.occurred_at, tx.id));
        self.transactions.insert(at, tx);
    }
}

fn push_balances(changes: &mut ChangeSet, balances: &BTreeMap<AccountId, i64>) {
    for (account_id, balance) in balances {
        changes.set_balance(*account_id, *balance);
    }
}

fn rejected(operation: &'static str) -> impl Fn(&EngineError) {
    move |err| tracing::warn!(operation, error = %err, "operation rejected")
}
