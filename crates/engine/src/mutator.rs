//! Balance deltas.
//!
//! Every change to an account balance made by a transaction goes through
//! [`balance_deltas`]. Reverting a transaction applies the exact negation of
//! the deltas it applied on creation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Account, AccountId, EngineError, ResultEngine, SplitType, Transaction, TransactionKind,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Apply,
    Revert,
}

impl Direction {
    fn sign(self) -> i64 {
        match self {
            Self::Apply => 1,
            Self::Revert => -1,
        }
    }
}

/// A signed change to one account balance, in minor units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub account_id: AccountId,
    pub amount_minor: i64,
}

/// Sign of the effect an amount has on the primary account.
fn primary_sign(kind: TransactionKind, split: SplitType) -> i64 {
    match (kind, split) {
        (TransactionKind::Income, _) => 1,
        (TransactionKind::Settlement, _) => 1,
        (TransactionKind::Expense, SplitType::CounterpartyPaid) => 0,
        (
            TransactionKind::Expense,
            SplitType::MeOnly | SplitType::Shared | SplitType::CounterpartyOnly,
        ) => -1,
        (TransactionKind::Transfer, _) => -1,
    }
}

/// Returns the balance changes `tx` makes (or undoes) on the ledger accounts.
///
/// Deltas are merged per account and zero entries are dropped, so the result
/// may be empty (counterparty-paid expenses, carry-forward entries, a
/// transfer between the earmarked account and its own bank).
pub fn balance_deltas(tx: &Transaction, direction: Direction) -> Vec<BalanceDelta> {
    if tx.is_carry_forward() {
        return Vec::new();
    }

    let amount = tx.amount_minor * direction.sign();
    let mut merged: BTreeMap<AccountId, i64> = BTreeMap::new();
    *merged.entry(tx.account_id).or_default() += primary_sign(tx.kind, tx.split) * amount;

    if tx.kind == TransactionKind::Transfer {
        if let Some(to) = tx.to_account_id {
            *merged.entry(to).or_default() += amount;
        }

        // The earmarked account is a label over its paired bank's money: the
        // bank mirrors whatever the earmarked leg does. On an internal move
        // between the two the bank legs cancel out.
        let legs = [(Some(tx.account_id), -amount), (tx.to_account_id, amount)];
        for (account, delta) in legs {
            if let Some(bank) = account.and_then(AccountId::paired_bank) {
                *merged.entry(bank).or_default() += delta;
            }
        }
    }

    merged
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .map(|(account_id, amount_minor)| BalanceDelta {
            account_id,
            amount_minor,
        })
        .collect()
}

/// Delta for changing the amount of `tx` by `diff` (new - old).
///
/// Transfers are excluded: their amount cannot be edited.
pub fn amount_change_delta(tx: &Transaction, diff: i64) -> Option<BalanceDelta> {
    if tx.is_carry_forward() || tx.kind == TransactionKind::Transfer {
        return None;
    }
    let amount_minor = primary_sign(tx.kind, tx.split) * diff;
    (amount_minor != 0).then_some(BalanceDelta {
        account_id: tx.account_id,
        amount_minor,
    })
}

/// Previews the balances that result from adding `deltas` to `accounts`.
///
/// Only touched accounts are returned. Fails when an account is missing or
/// a balance would overflow.
pub fn preview_balances(
    accounts: &BTreeMap<AccountId, Account>,
    deltas: &[BalanceDelta],
) -> ResultEngine<BTreeMap<AccountId, i64>> {
    let mut new_balances: BTreeMap<AccountId, i64> = BTreeMap::new();
    for delta in deltas {
        let account = accounts
            .get(&delta.account_id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("account {}", delta.account_id)))?;
        let entry = new_balances
            .entry(delta.account_id)
            .or_insert(account.balance);
        *entry = entry
            .checked_add(delta.amount_minor)
            .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;
    }
    Ok(new_balances)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn tx(
        kind: TransactionKind,
        split: SplitType,
        account_id: AccountId,
        to_account_id: Option<AccountId>,
        amount_minor: i64,
    ) -> Transaction {
        Transaction {
            id: Uuid::now_v7(),
            occurred_at: Utc::now(),
            description: "test".to_string(),
            amount_minor,
            account_id,
            to_account_id,
            kind,
            split,
            is_settled: false,
            settlement_id: None,
            carried_from: None,
        }
    }

    fn delta(account_id: AccountId, amount_minor: i64) -> BalanceDelta {
        BalanceDelta {
            account_id,
            amount_minor,
        }
    }

    #[test]
    fn single_account_table() {
        let cases = [
            (TransactionKind::Income, SplitType::MeOnly, 100),
            (TransactionKind::Income, SplitType::CounterpartyPaid, 100),
            (TransactionKind::Settlement, SplitType::CounterpartyPaid, 100),
            (TransactionKind::Expense, SplitType::MeOnly, -100),
            (TransactionKind::Expense, SplitType::Shared, -100),
            (TransactionKind::Expense, SplitType::CounterpartyOnly, -100),
        ];
        for (kind, split, expected) in cases {
            let t = tx(kind, split, AccountId::Cash, None, 100);
            assert_eq!(
                balance_deltas(&t, Direction::Apply),
                vec![delta(AccountId::Cash, expected)],
                "{kind:?}/{split:?}"
            );
        }
    }

    #[test]
    fn counterparty_paid_expense_leaves_balances_alone() {
        let t = tx(
            TransactionKind::Expense,
            SplitType::CounterpartyPaid,
            AccountId::Cash,
            None,
            100,
        );
        assert!(balance_deltas(&t, Direction::Apply).is_empty());
        assert!(balance_deltas(&t, Direction::Revert).is_empty());
    }

    #[test]
    fn transfer_moves_between_ordinary_accounts() {
        let t = tx(
            TransactionKind::Transfer,
            SplitType::MeOnly,
            AccountId::PrimaryBank,
            Some(AccountId::Cash),
            500,
        );
        let deltas = balance_deltas(&t, Direction::Apply);
        assert_eq!(
            deltas,
            vec![delta(AccountId::Cash, 500), delta(AccountId::PrimaryBank, -500)]
        );
        assert_eq!(deltas.iter().map(|d| d.amount_minor).sum::<i64>(), 0);
    }

    #[test]
    fn earmarked_internal_transfer_only_moves_the_label() {
        let into = tx(
            TransactionKind::Transfer,
            SplitType::MeOnly,
            AccountId::PrimaryBank,
            Some(AccountId::EarmarkedSavings),
            300,
        );
        assert_eq!(
            balance_deltas(&into, Direction::Apply),
            vec![delta(AccountId::EarmarkedSavings, 300)]
        );

        let out = tx(
            TransactionKind::Transfer,
            SplitType::MeOnly,
            AccountId::EarmarkedSavings,
            Some(AccountId::PrimaryBank),
            300,
        );
        assert_eq!(
            balance_deltas(&out, Direction::Apply),
            vec![delta(AccountId::EarmarkedSavings, -300)]
        );
    }

    #[test]
    fn earmarked_transfer_with_third_account_mirrors_on_bank() {
        let into = tx(
            TransactionKind::Transfer,
            SplitType::MeOnly,
            AccountId::Cash,
            Some(AccountId::EarmarkedSavings),
            200,
        );
        assert_eq!(
            balance_deltas(&into, Direction::Apply),
            vec![
                delta(AccountId::Cash, -200),
                delta(AccountId::PrimaryBank, 200),
                delta(AccountId::EarmarkedSavings, 200),
            ]
        );

        let out = tx(
            TransactionKind::Transfer,
            SplitType::MeOnly,
            AccountId::EarmarkedSavings,
            Some(AccountId::SecondaryBank),
            200,
        );
        assert_eq!(
            balance_deltas(&out, Direction::Apply),
            vec![
                delta(AccountId::PrimaryBank, -200),
                delta(AccountId::SecondaryBank, 200),
                delta(AccountId::EarmarkedSavings, -200),
            ]
        );
    }

    #[test]
    fn revert_negates_apply_for_every_kind_and_split() {
        let kinds = [
            TransactionKind::Expense,
            TransactionKind::Income,
            TransactionKind::Transfer,
            TransactionKind::Settlement,
        ];
        let splits = [
            SplitType::MeOnly,
            SplitType::CounterpartyOnly,
            SplitType::Shared,
            SplitType::CounterpartyPaid,
        ];
        for kind in kinds {
            for split in splits {
                for to in [Some(AccountId::Cash), Some(AccountId::EarmarkedSavings)] {
                    let to = (kind == TransactionKind::Transfer).then_some(to).flatten();
                    let t = tx(kind, split, AccountId::SecondaryBank, to, 1_234);
                    let applied = balance_deltas(&t, Direction::Apply);
                    let reverted = balance_deltas(&t, Direction::Revert);
                    let negated: Vec<_> = applied
                        .iter()
                        .map(|d| delta(d.account_id, -d.amount_minor))
                        .collect();
                    assert_eq!(reverted, negated, "{kind:?}/{split:?}");
                }
            }
        }
    }

    #[test]
    fn carry_forward_has_no_cash_effect() {
        let mut t = tx(
            TransactionKind::Expense,
            SplitType::CounterpartyOnly,
            AccountId::PrimaryBank,
            None,
            700,
        );
        t.carried_from = Some(Uuid::now_v7());
        assert!(balance_deltas(&t, Direction::Apply).is_empty());
        assert_eq!(amount_change_delta(&t, 50), None);
    }

    #[test]
    fn amount_change_uses_the_same_sign_rule() {
        let expense = tx(
            TransactionKind::Expense,
            SplitType::Shared,
            AccountId::Cash,
            None,
            100,
        );
        assert_eq!(
            amount_change_delta(&expense, 40),
            Some(delta(AccountId::Cash, -40))
        );
        let income = tx(
            TransactionKind::Income,
            SplitType::MeOnly,
            AccountId::Cash,
            None,
            100,
        );
        assert_eq!(
            amount_change_delta(&income, -30),
            Some(delta(AccountId::Cash, -30))
        );
        let paid = tx(
            TransactionKind::Expense,
            SplitType::CounterpartyPaid,
            AccountId::Cash,
            None,
            100,
        );
        assert_eq!(amount_change_delta(&paid, 30), None);
    }

    #[test]
    fn preview_rejects_unknown_accounts() {
        let accounts = BTreeMap::new();
        let err = preview_balances(&accounts, &[delta(AccountId::Cash, 1)]).unwrap_err();
        assert!(matches!(err, EngineError::KeyNotFound(_)));
    }
}
