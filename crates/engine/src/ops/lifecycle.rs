use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    AccountId, Change, ChangeSet, Direction, Engine, EngineError, LedgerStore, ResultEngine,
    SplitType, TransactionDraft, TransactionEdit, TransactionKind, amount_change_delta,
    balance_deltas,
    mutator::preview_balances,
    transactions::{validate_amount, validate_description},
};

use super::{push_balances, rejected};

impl<S: LedgerStore> Engine<S> {
    /// Records a new expense, income or transfer and applies its balance
    /// effect.
    ///
    /// Settlements cannot be created this way, see [`Engine::settle`].
    pub async fn create_transaction(&mut self, draft: TransactionDraft) -> ResultEngine<Uuid> {
        draft.validate().inspect_err(rejected("create_transaction"))?;
        self.account(draft.account_id)?;
        if let Some(to) = draft.to_account_id {
            self.account(to)?;
        }

        let tx = draft.into_transaction();
        let balances = preview_balances(&self.accounts, &balance_deltas(&tx, Direction::Apply))?;
        self.ensure_total_in_range(&balances)
            .and_then(|()| self.ensure_debt_in_range(self.transactions.iter().chain([&tx])))
            .inspect_err(rejected("create_transaction"))?;

        let mut changes = ChangeSet::new();
        push_balances(&mut changes, &balances);
        changes.push(Change::Insert(tx.clone()));
        self.commit("create_transaction", &changes).await?;

        self.apply_balances_to_memory(&balances);
        let id = tx.id;
        tracing::info!(
            transaction_id = %id,
            kind = tx.kind.as_str(),
            split = tx.split.as_str(),
            amount_minor = tx.amount_minor,
            "transaction created"
        );
        self.insert_into_memory(tx);
        Ok(id)
    }

    /// Moves `amount_minor` from one account to another.
    pub async fn transfer(
        &mut self,
        amount_minor: i64,
        from: AccountId,
        to: AccountId,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Uuid> {
        let description = format!(
            "Transfer: {} -> {}",
            self.account(from)?.name,
            self.account(to)?.name
        );
        let draft = TransactionDraft::transfer(amount_minor, &description, from, to, occurred_at);
        self.create_transaction(draft).await
    }

    /// Records the counterparty's fixed fund deposit into the settlement
    /// account. It stays open and lowers the next bill.
    pub async fn counterparty_deposit(
        &mut self,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Uuid> {
        let draft = TransactionDraft {
            kind: TransactionKind::Income,
            split: SplitType::CounterpartyPaid,
            amount_minor: self.settings.deposit_amount,
            description: format!("Deposit from {}", self.settings.counterparty_name),
            account_id: self.settings.settlement_account,
            to_account_id: None,
            occurred_at,
        };
        self.create_transaction(draft).await
    }

    /// Changes amount, description and date of a transaction.
    ///
    /// Only the difference between the old and new amount is applied to the
    /// account. Transfers and locked transactions keep their amount.
    pub async fn edit_transaction(&mut self, id: Uuid, edit: TransactionEdit) -> ResultEngine<()> {
        validate_amount(edit.amount_minor).inspect_err(rejected("edit_transaction"))?;
        validate_description(&edit.description).inspect_err(rejected("edit_transaction"))?;

        let index = self.transaction_index(id)?;
        let old = &self.transactions[index];
        let diff = edit.amount_minor - old.amount_minor;
        if diff != 0 {
            if old.kind == TransactionKind::Transfer {
                let err = EngineError::InvalidTransaction(
                    "the amount of a transfer cannot change, delete and recreate it".to_string(),
                );
                rejected("edit_transaction")(&err);
                return Err(err);
            }
            if old.is_locked() {
                let err = EngineError::Locked(id);
                rejected("edit_transaction")(&err);
                return Err(err);
            }
        }

        let balances = match amount_change_delta(old, diff) {
            Some(delta) => preview_balances(&self.accounts, &[delta])?,
            None => BTreeMap::new(),
        };
        let mut updated = old.clone();
        updated.amount_minor = edit.amount_minor;
        updated.description = edit.description.trim().to_string();
        updated.occurred_at = edit.occurred_at;
        self.ensure_total_in_range(&balances)
            .and_then(|()| {
                self.ensure_debt_in_range(
                    self.transactions
                        .iter()
                        .map(|t| if t.id == id { &updated } else { t }),
                )
            })
            .inspect_err(rejected("edit_transaction"))?;

        let mut changes = ChangeSet::new();
        push_balances(&mut changes, &balances);
        changes.push(Change::Update(updated.clone()));
        self.commit("edit_transaction", &changes).await?;

        self.apply_balances_to_memory(&balances);
        self.transactions.remove(index);
        tracing::info!(transaction_id = %id, amount_diff = diff, "transaction edited");
        self.insert_into_memory(updated);
        Ok(())
    }

    /// Deletes a transaction and reverts its balance effect.
    ///
    /// Locked transactions are refused. Deleting a settlement reopens every
    /// transaction it closed and drops its carry-forward.
    ///
    /// Settlements unwind newest first: once a later settlement has closed
    /// the carry-forward of an older one, the older one is refused as
    /// [`EngineError::Locked`] until the later one is deleted.
    pub async fn delete_transaction(&mut self, id: Uuid) -> ResultEngine<()> {
        let tx = self.transaction(id)?.clone();
        if tx.is_locked() {
            let err = EngineError::Locked(id);
            rejected("delete_transaction")(&err);
            return Err(err);
        }

        let balances = preview_balances(&self.accounts, &balance_deltas(&tx, Direction::Revert))?;

        let mut changes = ChangeSet::new();
        let carry_forward = if tx.kind == TransactionKind::Settlement {
            self.unwind_settlement_changes(id, &mut changes)
                .inspect_err(rejected("delete_transaction"))?
        } else {
            None
        };
        push_balances(&mut changes, &balances);
        changes.push(Change::Delete(id));
        self.commit("delete_transaction", &changes).await?;

        self.apply_balances_to_memory(&balances);
        if tx.kind == TransactionKind::Settlement {
            self.unwind_settlement_in_memory(id, carry_forward);
        }
        self.transactions.retain(|t| t.id != id);
        tracing::info!(
            transaction_id = %id,
            kind = tx.kind.as_str(),
            "transaction deleted"
        );
        Ok(())
    }

    /// Overrides the stored balance of an account.
    pub async fn set_account_balance(
        &mut self,
        account_id: AccountId,
        balance: i64,
    ) -> ResultEngine<()> {
        let previous = self.account(account_id)?.balance;
        let balances = BTreeMap::from([(account_id, balance)]);
        self.ensure_total_in_range(&balances)
            .inspect_err(rejected("set_account_balance"))?;

        let mut changes = ChangeSet::new();
        changes.set_balance(account_id, balance);
        self.commit("set_account_balance", &changes).await?;

        self.apply_balances_to_memory(&balances);
        tracing::info!(
            account = account_id.as_str(),
            previous,
            balance,
            "account balance overridden"
        );
        Ok(())
    }
}
