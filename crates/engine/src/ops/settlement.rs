use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Change, ChangeSet, Direction, Engine, EngineError, LedgerStore, Money, ResultEngine,
    SplitType, Transaction, TransactionKind, balance_deltas, mutator::preview_balances,
    split_share,
};

use super::{push_balances, rejected};

/// Open items the counterparty has a stake in, with what they add up to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    /// Newest first.
    pub items: Vec<Transaction>,
    pub net_debt: i64,
    /// What the counterparty should pay now: the debt, or nothing when in
    /// credit.
    pub suggested_payment: i64,
}

impl Bill {
    /// Surplus left over when `final_payment` is paid against this bill.
    pub fn surplus_for(&self, final_payment: i64) -> ResultEngine<i64> {
        Money::new(final_payment)
            .checked_sub(Money::new(self.net_debt))
            .map(Money::minor)
            .ok_or_else(|| EngineError::InvalidAmount("surplus out of range".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub settlement_id: Uuid,
    /// Absent when nothing was paid.
    pub settlement: Option<Transaction>,
    /// Absent when the payment matched the debt exactly.
    pub carry_forward: Option<Transaction>,
    pub settled_ids: Vec<Uuid>,
    pub surplus: i64,
}

/// Read-only picture of a past settlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementView {
    pub settlement_id: Uuid,
    pub settlement: Option<Transaction>,
    /// Transactions closed by the settlement, newest first.
    pub items: Vec<Transaction>,
    /// Debt the items amounted to.
    pub items_total: i64,
    pub amount_paid: i64,
    pub carry_forward: Option<Transaction>,
}

impl<S: LedgerStore> Engine<S> {
    /// The current bill.
    pub fn bill(&self) -> ResultEngine<Bill> {
        let items: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.is_open_item() && t.split.involves_counterparty())
            .cloned()
            .collect();
        let net_debt = self.net_debt()?;
        Ok(Bill {
            items,
            net_debt,
            suggested_payment: net_debt.max(0),
        })
    }

    /// Closes `open_ids` against a payment of `final_payment`.
    ///
    /// `surplus` is `final_payment - net_debt` as shown to the payer. A
    /// non-zero surplus is carried into the next period as an open expense:
    /// an overpayment becomes a counterparty-paid credit, an underpayment a
    /// counterparty-only debt. The carry-forward has no cash effect.
    pub async fn settle(
        &mut self,
        open_ids: &[Uuid],
        final_payment: i64,
        surplus: i64,
        now: DateTime<Utc>,
    ) -> ResultEngine<SettlementOutcome> {
        let ids = self
            .validate_settlement(open_ids, final_payment, surplus)
            .inspect_err(rejected("settle"))?;

        let settlement_id = Uuid::now_v7();
        let account_id = self.settings.settlement_account;
        let settlement = (final_payment > 0).then(|| Transaction {
            id: settlement_id,
            occurred_at: now,
            description: format!("Settlement with {}", self.settings.counterparty_name),
            amount_minor: final_payment,
            account_id,
            to_account_id: None,
            kind: TransactionKind::Settlement,
            split: SplitType::CounterpartyPaid,
            is_settled: true,
            settlement_id: None,
            carried_from: None,
        });
        let carry_forward = (surplus != 0).then(|| Transaction {
            id: Uuid::now_v7(),
            occurred_at: now,
            description: if surplus > 0 {
                "Credit carried from last settlement".to_string()
            } else {
                "Balance carried from last settlement".to_string()
            },
            amount_minor: surplus.abs(),
            account_id,
            to_account_id: None,
            kind: TransactionKind::Expense,
            split: if surplus > 0 {
                SplitType::CounterpartyPaid
            } else {
                SplitType::CounterpartyOnly
            },
            is_settled: false,
            settlement_id: None,
            carried_from: Some(settlement_id),
        });

        let balances = match &settlement {
            Some(tx) => preview_balances(&self.accounts, &balance_deltas(tx, Direction::Apply))?,
            None => BTreeMap::new(),
        };

        let mut changes = ChangeSet::new();
        for tx in settlement.iter().chain(carry_forward.iter()) {
            changes.push(Change::Insert(tx.clone()));
        }
        if !ids.is_empty() {
            changes.push(Change::MarkSettled {
                ids: ids.clone(),
                settlement_id,
            });
        }
        push_balances(&mut changes, &balances);
        self.commit("settle", &changes).await?;

        for tx in self.transactions.iter_mut().filter(|t| ids.contains(&t.id)) {
            tx.is_settled = true;
            tx.settlement_id = Some(settlement_id);
        }
        self.apply_balances_to_memory(&balances);
        for tx in settlement.iter().chain(carry_forward.iter()) {
            self.insert_into_memory(tx.clone());
        }
        tracing::info!(
            settlement_id = %settlement_id,
            settled = ids.len(),
            final_payment,
            surplus,
            "settlement recorded"
        );

        Ok(SettlementOutcome {
            settlement_id,
            settlement,
            carry_forward,
            settled_ids: ids,
            surplus,
        })
    }

    /// Settles every item of the current bill against `final_payment`.
    pub async fn settle_bill(
        &mut self,
        final_payment: i64,
        now: DateTime<Utc>,
    ) -> ResultEngine<SettlementOutcome> {
        let bill = self.bill()?;
        let surplus = bill.surplus_for(final_payment)?;
        let ids: Vec<Uuid> = bill.items.iter().map(|t| t.id).collect();
        self.settle(&ids, final_payment, surplus, now).await
    }

    /// Everything a past settlement closed.
    pub fn settlement_view(&self, settlement_id: Uuid) -> ResultEngine<SettlementView> {
        let settlement = self
            .transactions
            .iter()
            .find(|t| t.id == settlement_id && t.kind == TransactionKind::Settlement)
            .cloned();
        let items: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.settlement_id == Some(settlement_id))
            .cloned()
            .collect();
        let carry_forward = self.carry_forward_of(settlement_id).cloned();

        if settlement.is_none() && items.is_empty() && carry_forward.is_none() {
            return Err(EngineError::KeyNotFound(format!(
                "settlement {settlement_id}"
            )));
        }

        Ok(SettlementView {
            settlement_id,
            amount_paid: settlement.as_ref().map_or(0, |t| t.amount_minor),
            items_total: items_total(&items)?,
            settlement,
            items,
            carry_forward,
        })
    }

    /// Undoes a settlement: its payment, the links to the transactions it
    /// closed, and its carry-forward.
    ///
    /// Also covers settlements where nothing was paid and therefore no
    /// settlement transaction exists.
    pub async fn reopen_settlement(&mut self, settlement_id: Uuid) -> ResultEngine<()> {
        let has_settlement_tx = self
            .transactions
            .iter()
            .any(|t| t.id == settlement_id && t.kind == TransactionKind::Settlement);
        if has_settlement_tx {
            return self.delete_transaction(settlement_id).await;
        }

        let linked = self
            .transactions
            .iter()
            .any(|t| t.settlement_id == Some(settlement_id));
        if !linked && self.carry_forward_of(settlement_id).is_none() {
            return Err(EngineError::KeyNotFound(format!(
                "settlement {settlement_id}"
            )));
        }

        let mut changes = ChangeSet::new();
        let carry_forward = self
            .unwind_settlement_changes(settlement_id, &mut changes)
            .inspect_err(rejected("reopen_settlement"))?;
        self.commit("reopen_settlement", &changes).await?;

        self.unwind_settlement_in_memory(settlement_id, carry_forward);
        tracing::info!(settlement_id = %settlement_id, "settlement reopened");
        Ok(())
    }

    fn carry_forward_of(&self, settlement_id: Uuid) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|t| t.carried_from == Some(settlement_id))
    }

    fn validate_settlement(
        &self,
        open_ids: &[Uuid],
        final_payment: i64,
        surplus: i64,
    ) -> ResultEngine<Vec<Uuid>> {
        if final_payment < 0 {
            return Err(EngineError::InvalidAmount(
                "final payment must be >= 0".to_string(),
            ));
        }
        if surplus.checked_abs().is_none() {
            return Err(EngineError::InvalidAmount("surplus out of range".to_string()));
        }

        let mut seen = BTreeSet::new();
        let mut ids = Vec::with_capacity(open_ids.len());
        for id in open_ids {
            if !seen.insert(*id) {
                continue;
            }
            let tx = self.transaction(*id)?;
            if !tx.is_open_item() {
                return Err(EngineError::InvalidTransaction(format!(
                    "transaction {id} is not an open item"
                )));
            }
            ids.push(*id);
        }

        if ids.is_empty() && final_payment == 0 && surplus == 0 {
            return Err(EngineError::InvalidTransaction(
                "nothing to settle".to_string(),
            ));
        }
        Ok(ids)
    }

    /// Queues the store writes that detach everything from `settlement_id`.
    ///
    /// Returns the carry-forward to delete, if it is still open. A
    /// carry-forward already closed by a later settlement locks this one.
    pub(super) fn unwind_settlement_changes(
        &self,
        settlement_id: Uuid,
        changes: &mut ChangeSet,
    ) -> ResultEngine<Option<Uuid>> {
        let carry_forward = match self.carry_forward_of(settlement_id) {
            Some(tx) if tx.is_settled => return Err(EngineError::Locked(tx.id)),
            Some(tx) => Some(tx.id),
            None => None,
        };
        changes.push(Change::MarkUnsettled { settlement_id });
        if let Some(id) = carry_forward {
            changes.push(Change::Delete(id));
        }
        Ok(carry_forward)
    }

    pub(super) fn unwind_settlement_in_memory(
        &mut self,
        settlement_id: Uuid,
        carry_forward: Option<Uuid>,
    ) {
        let mut reopened = 0usize;
        for tx in self
            .transactions
            .iter_mut()
            .filter(|t| t.settlement_id == Some(settlement_id))
        {
            tx.is_settled = false;
            tx.settlement_id = None;
            reopened += 1;
        }
        if let Some(id) = carry_forward {
            self.transactions.retain(|t| t.id != id);
        }
        tracing::debug!(
            settlement_id = %settlement_id,
            reopened,
            net_debt = ?self.net_debt().ok(),
            "settlement unwound"
        );
    }
}

fn items_total(items: &[Transaction]) -> ResultEngine<i64> {
    items
        .iter()
        .try_fold(Money::new(0), |acc, tx| acc.checked_add(Money::new(split_share(tx))))
        .map(Money::minor)
        .ok_or_else(|| EngineError::InvalidAmount("settled total out of range".to_string()))
}
