use chrono::{TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    AccountId, Engine, EngineError, HistoryFilter, LedgerSettings, LedgerStore, SplitType,
    SqlStore, TransactionDraft, TransactionEdit, TransactionKind,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine<SqlStore>, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .store(SqlStore::new(db.clone()))
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn balance(engine: &Engine<SqlStore>, id: AccountId) -> i64 {
    engine.account(id).unwrap().balance
}

async fn stored_balance(db: &DatabaseConnection, id: AccountId) -> i64 {
    SqlStore::new(db.clone())
        .accounts()
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.id == id)
        .unwrap()
        .balance
}

#[tokio::test]
async fn bootstrap_seeds_accounts_once() {
    let (engine, db) = engine_with_db().await;
    assert_eq!(engine.accounts().count(), AccountId::ALL.len());
    assert!(engine.accounts().all(|a| a.balance == 0));

    // a second start on the same database keeps what is there
    let again = Engine::builder()
        .store(SqlStore::new(db.clone()))
        .build()
        .await
        .unwrap();
    assert_eq!(again.accounts().count(), AccountId::ALL.len());
}

#[tokio::test]
async fn earmarked_account_is_added_with_opening_balance() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    // a ledger created before the earmarked account existed
    let store = SqlStore::new(db.clone());
    let older: Vec<_> = engine::default_accounts()
        .into_iter()
        .filter(|a| a.id != AccountId::EarmarkedSavings)
        .collect();
    assert!(store.seed_accounts_if_empty(&older).await.unwrap());

    let engine = Engine::builder()
        .store(store)
        .settings(LedgerSettings::default())
        .build()
        .await
        .unwrap();
    assert_eq!(balance(&engine, AccountId::EarmarkedSavings), 295_000);
}

#[tokio::test]
async fn expense_and_income_move_the_account() {
    let (mut engine, db) = engine_with_db().await;
    let now = Utc::now();

    engine
        .create_transaction(TransactionDraft::income(1_000, "salary", AccountId::Cash, now))
        .await
        .unwrap();
    let id = engine
        .create_transaction(TransactionDraft::expense(
            300,
            "groceries",
            AccountId::Cash,
            SplitType::Shared,
            now,
        ))
        .await
        .unwrap();

    assert_eq!(balance(&engine, AccountId::Cash), 700);
    assert_eq!(stored_balance(&db, AccountId::Cash).await, 700);

    let tx = engine.transaction(id).unwrap();
    assert_eq!(tx.kind, TransactionKind::Expense);
    assert!(!tx.is_settled);
    assert_eq!(engine.net_debt().unwrap(), 150);
}

#[tokio::test]
async fn counterparty_paid_expense_skips_the_balance() {
    let (mut engine, db) = engine_with_db().await;
    engine
        .create_transaction(TransactionDraft::expense(
            200,
            "dinner",
            AccountId::Cash,
            SplitType::CounterpartyPaid,
            Utc::now(),
        ))
        .await
        .unwrap();

    assert_eq!(balance(&engine, AccountId::Cash), 0);
    assert_eq!(stored_balance(&db, AccountId::Cash).await, 0);
    assert_eq!(engine.net_debt().unwrap(), -200);
}

#[tokio::test]
async fn validation_errors_change_nothing() {
    let (mut engine, _db) = engine_with_db().await;
    let now = Utc::now();

    let zero = TransactionDraft::expense(0, "x", AccountId::Cash, SplitType::MeOnly, now);
    assert!(matches!(
        engine.create_transaction(zero).await,
        Err(EngineError::InvalidAmount(_))
    ));

    let blank = TransactionDraft::expense(10, "   ", AccountId::Cash, SplitType::MeOnly, now);
    assert!(matches!(
        engine.create_transaction(blank).await,
        Err(EngineError::InvalidTransaction(_))
    ));

    assert!(matches!(
        engine
            .transfer(10, AccountId::Cash, AccountId::Cash, now)
            .await,
        Err(EngineError::InvalidTransaction(_))
    ));

    let mut settlement = TransactionDraft::income(10, "sneaky", AccountId::Cash, now);
    settlement.kind = TransactionKind::Settlement;
    assert!(engine.create_transaction(settlement).await.is_err());

    assert!(engine.transactions().is_empty());
    assert_eq!(engine.total_balance().unwrap(), 0);
}

#[tokio::test]
async fn transfer_conserves_the_total() {
    let (mut engine, db) = engine_with_db().await;
    let now = Utc::now();
    engine
        .set_account_balance(AccountId::PrimaryBank, 1_000)
        .await
        .unwrap();
    let total = engine.total_balance().unwrap();

    let id = engine
        .transfer(400, AccountId::PrimaryBank, AccountId::Cash, now)
        .await
        .unwrap();

    assert_eq!(balance(&engine, AccountId::PrimaryBank), 600);
    assert_eq!(balance(&engine, AccountId::Cash), 400);
    assert_eq!(engine.total_balance().unwrap(), total);
    assert_eq!(stored_balance(&db, AccountId::Cash).await, 400);

    let tx = engine.transaction(id).unwrap();
    assert!(tx.is_settled);
    assert_eq!(tx.to_account_id, Some(AccountId::Cash));
}

#[tokio::test]
async fn earmarked_transfers_follow_the_paired_bank() {
    let (mut engine, _db) = engine_with_db().await;
    let now = Utc::now();

    // internal reallocation only moves the label
    engine
        .transfer(100, AccountId::PrimaryBank, AccountId::EarmarkedSavings, now)
        .await
        .unwrap();
    assert_eq!(balance(&engine, AccountId::PrimaryBank), 0);
    assert_eq!(balance(&engine, AccountId::EarmarkedSavings), 100);

    // cash put aside raises both the label and the bank
    engine
        .transfer(50, AccountId::Cash, AccountId::EarmarkedSavings, now)
        .await
        .unwrap();
    assert_eq!(balance(&engine, AccountId::Cash), -50);
    assert_eq!(balance(&engine, AccountId::PrimaryBank), 50);
    assert_eq!(balance(&engine, AccountId::EarmarkedSavings), 150);
}

#[tokio::test]
async fn edit_applies_only_the_difference() {
    let (mut engine, db) = engine_with_db().await;
    let now = Utc::now();
    let id = engine
        .create_transaction(TransactionDraft::expense(
            100,
            "taxi",
            AccountId::SecondaryBank,
            SplitType::CounterpartyOnly,
            now,
        ))
        .await
        .unwrap();

    let later = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
    engine
        .edit_transaction(
            id,
            TransactionEdit {
                amount_minor: 160,
                description: " taxi home ".to_string(),
                occurred_at: later,
            },
        )
        .await
        .unwrap();

    assert_eq!(balance(&engine, AccountId::SecondaryBank), -160);
    assert_eq!(stored_balance(&db, AccountId::SecondaryBank).await, -160);
    let tx = engine.transaction(id).unwrap();
    assert_eq!(tx.amount_minor, 160);
    assert_eq!(tx.description, "taxi home");
    assert_eq!(tx.occurred_at, later);
    assert_eq!(engine.net_debt().unwrap(), 160);
}

#[tokio::test]
async fn transfer_amount_cannot_be_edited() {
    let (mut engine, _db) = engine_with_db().await;
    let now = Utc::now();
    let id = engine
        .transfer(100, AccountId::Cash, AccountId::Savings, now)
        .await
        .unwrap();

    let err = engine
        .edit_transaction(
            id,
            TransactionEdit {
                amount_minor: 120,
                description: "move".to_string(),
                occurred_at: now,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransaction(_)));

    // same amount, new description is fine
    engine
        .edit_transaction(
            id,
            TransactionEdit {
                amount_minor: 100,
                description: "to savings".to_string(),
                occurred_at: now,
            },
        )
        .await
        .unwrap();
    assert_eq!(engine.transaction(id).unwrap().description, "to savings");
    assert_eq!(balance(&engine, AccountId::Savings), 100);
}

#[tokio::test]
async fn apply_then_delete_restores_every_balance() {
    let (mut engine, db) = engine_with_db().await;
    let now = Utc::now();
    let drafts = vec![
        TransactionDraft::expense(70, "a", AccountId::Cash, SplitType::MeOnly, now),
        TransactionDraft::expense(70, "b", AccountId::Cash, SplitType::Shared, now),
        TransactionDraft::expense(70, "c", AccountId::Cash, SplitType::CounterpartyOnly, now),
        TransactionDraft::expense(70, "d", AccountId::Cash, SplitType::CounterpartyPaid, now),
        TransactionDraft::income(70, "e", AccountId::Savings, now),
        TransactionDraft::transfer(70, "f", AccountId::Cash, AccountId::EarmarkedSavings, now),
        TransactionDraft::transfer(70, "g", AccountId::EarmarkedSavings, AccountId::PrimaryBank, now),
    ];

    for draft in drafts {
        let before: Vec<_> = engine.accounts().cloned().collect();
        let id = engine.create_transaction(draft).await.unwrap();
        engine.delete_transaction(id).await.unwrap();
        let after: Vec<_> = engine.accounts().cloned().collect();
        assert_eq!(before, after);
    }

    assert!(engine.transactions().is_empty());
    for id in AccountId::ALL {
        assert_eq!(stored_balance(&db, id).await, 0);
    }
}

#[tokio::test]
async fn settled_expense_is_locked() {
    let (mut engine, _db) = engine_with_db().await;
    let now = Utc::now();
    let id = engine
        .create_transaction(TransactionDraft::expense(
            100,
            "rent share",
            AccountId::Cash,
            SplitType::CounterpartyOnly,
            now,
        ))
        .await
        .unwrap();
    engine.settle_bill(100, now).await.unwrap();

    let before: Vec<_> = engine.accounts().cloned().collect();
    let count = engine.transactions().len();
    assert_eq!(
        engine.delete_transaction(id).await,
        Err(EngineError::Locked(id))
    );
    assert_eq!(engine.transactions().len(), count);
    assert_eq!(engine.accounts().cloned().collect::<Vec<_>>(), before);

    // amount is frozen, description is not
    let edit = TransactionEdit {
        amount_minor: 90,
        description: "rent share".to_string(),
        occurred_at: now,
    };
    assert_eq!(
        engine.edit_transaction(id, edit).await,
        Err(EngineError::Locked(id))
    );
    engine
        .edit_transaction(
            id,
            TransactionEdit {
                amount_minor: 100,
                description: "rent share (march)".to_string(),
                occurred_at: now,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn counterparty_deposit_lowers_the_debt() {
    let (mut engine, _db) = engine_with_db().await;
    let id = engine.counterparty_deposit(Utc::now()).await.unwrap();

    let tx = engine.transaction(id).unwrap();
    assert_eq!(tx.kind, TransactionKind::Income);
    assert_eq!(tx.split, SplitType::CounterpartyPaid);
    assert!(!tx.is_settled);
    assert_eq!(balance(&engine, AccountId::PrimaryBank), 300_000);
    assert_eq!(engine.net_debt().unwrap(), -300_000);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let (mut engine, _db) = engine_with_db().await;
    let missing = uuid::Uuid::now_v7();
    assert!(matches!(
        engine.delete_transaction(missing).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.settlement_view(missing),
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn history_survives_a_reload() {
    let (mut engine, db) = engine_with_db().await;
    let day = |d| Utc.with_ymd_and_hms(2025, 3, d, 12, 0, 0).unwrap();
    engine
        .create_transaction(TransactionDraft::expense(
            10,
            "old",
            AccountId::Cash,
            SplitType::Shared,
            day(1),
        ))
        .await
        .unwrap();
    engine
        .create_transaction(TransactionDraft::expense(
            20,
            "new",
            AccountId::Cash,
            SplitType::MeOnly,
            day(5),
        ))
        .await
        .unwrap();
    engine
        .transfer(5, AccountId::Cash, AccountId::Savings, day(3))
        .await
        .unwrap();

    let reloaded = Engine::builder()
        .store(SqlStore::new(db.clone()))
        .build()
        .await
        .unwrap();
    assert_eq!(reloaded.transactions(), engine.transactions());

    let personal: Vec<_> = reloaded
        .history(HistoryFilter::Personal)
        .into_iter()
        .map(|t| t.description.as_str())
        .collect();
    assert_eq!(personal, vec!["new", "Transfer: Cash -> Savings", "old"]);

    let counterparty = reloaded.history(HistoryFilter::Counterparty);
    assert_eq!(counterparty.len(), 1);

    let stats = reloaded.monthly_stats(2025, 3).unwrap();
    assert_eq!(stats.expense, 30);
    assert_eq!(stats.income, 0);
}
