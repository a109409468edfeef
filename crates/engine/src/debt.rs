//! Net debt between me and the counterparty.
//!
//! Positive means the counterparty owes me, negative is a credit carried to
//! the next period.

use crate::{EngineError, Money, ResultEngine, SplitType, Transaction, TransactionKind};

/// Contribution of a single transaction to the net debt.
///
/// Settled transactions, transfers and settlements never contribute.
pub fn debt_share(tx: &Transaction) -> i64 {
    if !tx.is_open_item() {
        return 0;
    }
    split_share(tx)
}

/// What `tx` puts on the counterparty's side, whether settled or not.
///
/// A shared expense counts half its amount rounded down, the odd minor unit
/// stays with the payer.
pub fn split_share(tx: &Transaction) -> i64 {
    match (tx.kind, tx.split) {
        (TransactionKind::Expense, SplitType::CounterpartyOnly) => tx.amount_minor,
        (TransactionKind::Expense, SplitType::Shared) => tx.amount_minor.div_euclid(2),
        (TransactionKind::Expense, SplitType::CounterpartyPaid) => -tx.amount_minor,
        (TransactionKind::Income, SplitType::CounterpartyPaid) => -tx.amount_minor,
        (TransactionKind::Expense, SplitType::MeOnly)
        | (
            TransactionKind::Income,
            SplitType::MeOnly | SplitType::Shared | SplitType::CounterpartyOnly,
        )
        | (TransactionKind::Transfer | TransactionKind::Settlement, _) => 0,
    }
}

/// Sum of [`debt_share`] over `transactions`, minus `base_fee`.
///
/// Fails with [`EngineError::InvalidAmount`] when the figure leaves the
/// `i64` range.
pub fn net_debt<'a, I>(transactions: I, base_fee: i64) -> ResultEngine<i64>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let out_of_range = || EngineError::InvalidAmount("net debt out of range".to_string());

    let open = transactions
        .into_iter()
        .try_fold(Money::new(0), |acc, tx| {
            acc.checked_add(Money::new(debt_share(tx)))
        })
        .ok_or_else(out_of_range)?;
    let net = open
        .checked_sub(Money::new(base_fee))
        .ok_or_else(out_of_range)?;
    Ok(net.minor())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::AccountId;

    fn tx(kind: TransactionKind, split: SplitType, amount_minor: i64, settled: bool) -> Transaction {
        Transaction {
            id: Uuid::now_v7(),
            occurred_at: Utc::now(),
            description: "test".to_string(),
            amount_minor,
            account_id: AccountId::Cash,
            to_account_id: None,
            kind,
            split,
            is_settled: settled,
            settlement_id: None,
            carried_from: None,
        }
    }

    #[test]
    fn shared_and_counterparty_only_add_up() {
        let txs = [
            tx(TransactionKind::Expense, SplitType::Shared, 100, false),
            tx(TransactionKind::Expense, SplitType::CounterpartyOnly, 50, false),
        ];
        assert_eq!(net_debt(&txs, 0).unwrap(), 100);
    }

    #[test]
    fn counterparty_paid_is_a_credit() {
        let txs = [tx(TransactionKind::Expense, SplitType::CounterpartyPaid, 200, false)];
        assert_eq!(net_debt(&txs, 0).unwrap(), -200);

        let deposit = [tx(TransactionKind::Income, SplitType::CounterpartyPaid, 300, false)];
        assert_eq!(net_debt(&deposit, 0).unwrap(), -300);
    }

    #[test]
    fn odd_shared_amount_rounds_down() {
        let txs = [tx(TransactionKind::Expense, SplitType::Shared, 101, false)];
        assert_eq!(net_debt(&txs, 0).unwrap(), 50);
    }

    #[test]
    fn closed_and_neutral_items_do_not_count() {
        let txs = [
            tx(TransactionKind::Expense, SplitType::CounterpartyOnly, 70, true),
            tx(TransactionKind::Expense, SplitType::MeOnly, 70, false),
            tx(TransactionKind::Income, SplitType::MeOnly, 70, false),
            tx(TransactionKind::Transfer, SplitType::CounterpartyOnly, 70, false),
            tx(TransactionKind::Settlement, SplitType::CounterpartyPaid, 70, false),
        ];
        assert_eq!(net_debt(&txs, 0).unwrap(), 0);
    }

    #[test]
    fn split_share_ignores_settled_state() {
        let settled = tx(TransactionKind::Expense, SplitType::Shared, 80, true);
        assert_eq!(debt_share(&settled), 0);
        assert_eq!(split_share(&settled), 40);
    }

    #[test]
    fn base_fee_is_subtracted() {
        let txs = [tx(TransactionKind::Expense, SplitType::CounterpartyOnly, 500, false)];
        assert_eq!(net_debt(&txs, 120).unwrap(), 380);
    }

    #[test]
    fn order_does_not_matter() {
        let mut txs = vec![
            tx(TransactionKind::Expense, SplitType::Shared, 333, false),
            tx(TransactionKind::Expense, SplitType::CounterpartyOnly, 40, false),
            tx(TransactionKind::Expense, SplitType::CounterpartyPaid, 90, false),
            tx(TransactionKind::Income, SplitType::CounterpartyPaid, 25, false),
            tx(TransactionKind::Expense, SplitType::Shared, 7, true),
        ];
        let expected = net_debt(&txs, 10).unwrap();
        for _ in 0..txs.len() {
            txs.rotate_left(1);
            assert_eq!(net_debt(&txs, 10).unwrap(), expected);
            txs.reverse();
            assert_eq!(net_debt(&txs, 10).unwrap(), expected);
            // idempotent
            assert_eq!(net_debt(&txs, 10).unwrap(), expected);
        }
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let huge = i64::MAX / 2 + 1;
        let txs = [
            tx(TransactionKind::Expense, SplitType::CounterpartyPaid, huge, false),
            tx(TransactionKind::Expense, SplitType::CounterpartyPaid, huge, false),
            tx(TransactionKind::Expense, SplitType::CounterpartyPaid, huge, false),
        ];
        assert!(matches!(net_debt(&txs, 0), Err(EngineError::InvalidAmount(_))));
        assert!(matches!(net_debt(&txs[..2], 0), Ok(i64::MIN)));

        let owed = [tx(TransactionKind::Expense, SplitType::CounterpartyOnly, i64::MAX, false)];
        assert!(matches!(net_debt(&owed, -1), Err(EngineError::InvalidAmount(_))));
    }
}
