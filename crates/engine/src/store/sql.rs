use async_trait::async_trait;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseConnection, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use super::{Change, ChangeSet, LedgerStore};
use crate::{Account, AccountId, EngineError, ResultEngine, Transaction, accounts, transactions};

/// Ledger store backed by a sea-orm connection (SQLite in practice).
///
/// [`LedgerStore::commit`] runs every change of an operation inside one
/// database transaction.
#[derive(Clone, Debug)]
pub struct SqlStore {
    database: DatabaseConnection,
}

impl SqlStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.database
    }
}

async fn set_balance<C: ConnectionTrait>(
    db: &C,
    account_id: AccountId,
    balance: i64,
) -> ResultEngine<()> {
    let account_model = accounts::ActiveModel {
        id: ActiveValue::Set(account_id.as_str().to_string()),
        balance: ActiveValue::Set(balance),
        ..Default::default()
    };
    account_model.update(db).await.map_err(|err| match err {
        DbErr::RecordNotUpdated => EngineError::KeyNotFound(format!("account {account_id}")),
        other => other.into(),
    })?;
    Ok(())
}

async fn insert_transaction<C: ConnectionTrait>(db: &C, tx: &Transaction) -> ResultEngine<()> {
    transactions::ActiveModel::from(tx).insert(db).await?;
    Ok(())
}

async fn update_transaction<C: ConnectionTrait>(db: &C, tx: &Transaction) -> ResultEngine<()> {
    transactions::ActiveModel::from(tx)
        .update(db)
        .await
        .map_err(|err| match err {
            DbErr::RecordNotUpdated => EngineError::KeyNotFound(format!("transaction {}", tx.id)),
            other => other.into(),
        })?;
    Ok(())
}

async fn delete_transaction<C: ConnectionTrait>(db: &C, id: Uuid) -> ResultEngine<()> {
    let result = transactions::Entity::delete_by_id(id.to_string())
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(EngineError::KeyNotFound(format!("transaction {id}")));
    }
    Ok(())
}

async fn mark_settled<C: ConnectionTrait>(
    db: &C,
    ids: &[Uuid],
    settlement_id: Uuid,
) -> ResultEngine<()> {
    if ids.is_empty() {
        return Ok(());
    }
    transactions::Entity::update_many()
        .col_expr(transactions::Column::IsSettled, Expr::value(true))
        .col_expr(
            transactions::Column::SettlementId,
            Expr::value(Some(settlement_id.to_string())),
        )
        .filter(transactions::Column::Id.is_in(ids.iter().map(Uuid::to_string)))
        .exec(db)
        .await?;
    Ok(())
}

async fn mark_unsettled<C: ConnectionTrait>(db: &C, settlement_id: Uuid) -> ResultEngine<()> {
    transactions::Entity::update_many()
        .col_expr(transactions::Column::IsSettled, Expr::value(false))
        .col_expr(
            transactions::Column::SettlementId,
            Expr::value(Option::<String>::None),
        )
        .filter(transactions::Column::SettlementId.eq(settlement_id.to_string()))
        .exec(db)
        .await?;
    Ok(())
}

async fn apply_change<C: ConnectionTrait>(db: &C, change: &Change) -> ResultEngine<()> {
    match change {
        Change::SetBalance {
            account_id,
            balance,
        } => set_balance(db, *account_id, *balance).await,
        Change::Insert(tx) => insert_transaction(db, tx).await,
        Change::Update(tx) => update_transaction(db, tx).await,
        Change::Delete(id) => delete_transaction(db, *id).await,
        Change::MarkSettled { ids, settlement_id } => mark_settled(db, ids, *settlement_id).await,
        Change::MarkUnsettled { settlement_id } => mark_unsettled(db, *settlement_id).await,
    }
}

#[async_trait]
impl LedgerStore for SqlStore {
    async fn accounts(&self) -> ResultEngine<Vec<Account>> {
        accounts::Entity::find()
            .all(&self.database)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn transactions(&self) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn update_account_balance(
        &self,
        account_id: AccountId,
        balance: i64,
    ) -> ResultEngine<()> {
        set_balance(&self.database, account_id, balance).await
    }

    async fn add_transaction(&self, tx: &Transaction) -> ResultEngine<()> {
        insert_transaction(&self.database, tx).await
    }

    async fn update_transaction(&self, tx: &Transaction) -> ResultEngine<()> {
        update_transaction(&self.database, tx).await
    }

    async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()> {
        delete_transaction(&self.database, id).await
    }

    async fn mark_transactions_settled(
        &self,
        ids: &[Uuid],
        settlement_id: Uuid,
    ) -> ResultEngine<()> {
        mark_settled(&self.database, ids, settlement_id).await
    }

    async fn mark_transactions_unsettled(&self, settlement_id: Uuid) -> ResultEngine<()> {
        mark_unsettled(&self.database, settlement_id).await
    }

    async fn seed_accounts_if_empty(&self, defaults: &[Account]) -> ResultEngine<bool> {
        let existing = accounts::Entity::find().count(&self.database).await?;
        if existing > 0 {
            return Ok(false);
        }
        let db_tx = self.database.begin().await?;
        for account in defaults {
            accounts::ActiveModel::from(account).insert(&db_tx).await?;
        }
        db_tx.commit().await?;
        Ok(true)
    }

    async fn ensure_account_exists(&self, account: &Account) -> ResultEngine<()> {
        let existing = accounts::Entity::find_by_id(account.id.as_str().to_string())
            .one(&self.database)
            .await?;
        if existing.is_none() {
            accounts::ActiveModel::from(account)
                .insert(&self.database)
                .await?;
        }
        Ok(())
    }

    async fn commit(&self, changes: &ChangeSet) -> ResultEngine<()> {
        let db_tx = self.database.begin().await?;
        for change in changes.iter() {
            apply_change(&db_tx, change).await?;
        }
        db_tx.commit().await?;
        Ok(())
    }
}
