use std::collections::BTreeMap;
use uuid::Uuid;

pub use accounts::{Account, AccountId, default_accounts};
pub use debt::{debt_share, net_debt, split_share};
pub use error::EngineError;
pub use history::{DailyTotals, HistoryFilter, MonthlyStats, monthly_stats};
pub use money::Money;
pub use mutator::{BalanceDelta, Direction, amount_change_delta, balance_deltas};
pub use ops::{Bill, SettlementOutcome, SettlementView};
pub use settings::LedgerSettings;
pub use store::{Change, ChangeSet, LedgerStore, MemoryStore, SqlStore};
pub use transactions::{SplitType, Transaction, TransactionDraft, TransactionEdit, TransactionKind};

pub mod accounts;
mod debt;
mod error;
mod history;
mod money;
mod mutator;
mod ops;
mod settings;
mod store;
pub mod transactions;

type ResultEngine<T> = Result<T, EngineError>;

/// The ledger.
///
/// Holds the in-memory mirror of the accounts and transactions kept in its
/// [`LedgerStore`]. Every mutating operation commits to the store first and
/// only then updates the mirror, so a failed write leaves the mirror as it
/// was.
#[derive(Debug)]
pub struct Engine<S: LedgerStore> {
    accounts: BTreeMap<AccountId, Account>,
    /// Newest first.
    transactions: Vec<Transaction>,
    store: S,
    settings: LedgerSettings,
}

impl<S: LedgerStore> Engine<S> {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder<S> {
        EngineBuilder::default()
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All accounts, ordered by id.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn account(&self, account_id: AccountId) -> ResultEngine<&Account> {
        self.accounts
            .get(&account_id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("account {account_id}")))
    }

    /// Sum of every account balance.
    pub fn total_balance(&self) -> ResultEngine<i64> {
        self.accounts
            .values()
            .try_fold(Money::new(0), |acc, a| acc.checked_add(Money::new(a.balance)))
            .map(Money::minor)
            .ok_or_else(|| EngineError::InvalidAmount("total balance out of range".to_string()))
    }

    /// All transactions, newest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transaction(&self, id: Uuid) -> ResultEngine<&Transaction> {
        self.transactions
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("transaction {id}")))
    }

    /// What the counterparty currently owes. Negative is a credit.
    pub fn net_debt(&self) -> ResultEngine<i64> {
        net_debt(&self.transactions, self.settings.base_fee)
    }

    /// Reloads the mirror from the store.
    pub async fn reload(&mut self) -> ResultEngine<()> {
        let accounts = self.store.accounts().await?;
        let transactions = self.store.transactions().await?;
        self.accounts = accounts.into_iter().map(|a| (a.id, a)).collect();
        self.transactions = transactions;
        Ok(())
    }
}

/// The builder for `Engine`
pub struct EngineBuilder<S> {
    store: Option<S>,
    settings: LedgerSettings,
}

impl<S> Default for EngineBuilder<S> {
    fn default() -> Self {
        Self {
            store: None,
            settings: LedgerSettings::default(),
        }
    }
}

impl<S: LedgerStore> EngineBuilder<S> {
    /// Pass the required store
    pub fn store(mut self, store: S) -> EngineBuilder<S> {
        self.store = Some(store);
        self
    }

    pub fn settings(mut self, settings: LedgerSettings) -> EngineBuilder<S> {
        self.settings = settings;
        self
    }

    /// Construct `Engine`.
    ///
    /// Seeds the default accounts on an empty store, makes sure the
    /// earmarked account exists, then loads everything into memory.
    pub async fn build(self) -> ResultEngine<Engine<S>> {
        let store = self
            .store
            .ok_or_else(|| EngineError::Store("no ledger store configured".to_string()))?;

        let defaults = default_accounts();
        if store.seed_accounts_if_empty(&defaults).await? {
            tracing::info!(accounts = defaults.len(), "seeded default accounts");
        }
        if let Some(earmarked) = defaults
            .into_iter()
            .find(|a| a.id == AccountId::EarmarkedSavings)
        {
            let earmarked = earmarked.with_balance(self.settings.earmarked_opening_balance);
            store.ensure_account_exists(&earmarked).await?;
        }

        let mut engine = Engine {
            accounts: BTreeMap::new(),
            transactions: Vec::new(),
            store,
            settings: self.settings,
        };
        engine.reload().await?;
        tracing::debug!(
            accounts = engine.accounts.len(),
            transactions = engine.transactions.len(),
            "ledger loaded"
        );
        Ok(engine)
    }
}
