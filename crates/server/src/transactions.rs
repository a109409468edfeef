//! Transactions API endpoints

use api_types::transaction::{
    DepositNew, HistoryFilter as ApiFilter, SplitType as ApiSplit, TransactionCreated,
    TransactionKind as ApiKind, TransactionList, TransactionListResponse, TransactionNew,
    TransactionUpdate, TransactionView, TransferNew,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, FixedOffset, Utc};
use engine::{HistoryFilter, LedgerSettings, SplitType, Transaction, TransactionKind};
use uuid::Uuid;

use crate::{
    ServerError,
    accounts::{engine_account_id, map_account_id},
    server::ServerState,
};

fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Expense => ApiKind::Expense,
        TransactionKind::Income => ApiKind::Income,
        TransactionKind::Transfer => ApiKind::Transfer,
        TransactionKind::Settlement => ApiKind::Settlement,
    }
}

fn map_split(split: SplitType) -> ApiSplit {
    match split {
        SplitType::MeOnly => ApiSplit::MeOnly,
        SplitType::CounterpartyOnly => ApiSplit::CounterpartyOnly,
        SplitType::Shared => ApiSplit::Shared,
        SplitType::CounterpartyPaid => ApiSplit::CounterpartyPaid,
    }
}

fn engine_kind(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Expense => TransactionKind::Expense,
        ApiKind::Income => TransactionKind::Income,
        ApiKind::Transfer => TransactionKind::Transfer,
        ApiKind::Settlement => TransactionKind::Settlement,
    }
}

fn engine_split(split: ApiSplit) -> SplitType {
    match split {
        ApiSplit::MeOnly => SplitType::MeOnly,
        ApiSplit::CounterpartyOnly => SplitType::CounterpartyOnly,
        ApiSplit::Shared => SplitType::Shared,
        ApiSplit::CounterpartyPaid => SplitType::CounterpartyPaid,
    }
}

fn engine_filter(filter: ApiFilter) -> HistoryFilter {
    match filter {
        ApiFilter::Counterparty => HistoryFilter::Counterparty,
        ApiFilter::Personal => HistoryFilter::Personal,
        ApiFilter::Bills => HistoryFilter::Bills,
        ApiFilter::All => HistoryFilter::All,
    }
}

fn occurred_at(value: Option<DateTime<FixedOffset>>) -> DateTime<Utc> {
    value.map_or_else(Utc::now, |dt| dt.with_timezone(&Utc))
}

/// Renders a transaction with its date in the ledger timezone.
pub(crate) fn view(tx: &Transaction, settings: &LedgerSettings) -> TransactionView {
    TransactionView {
        id: tx.id,
        occurred_at: tx.occurred_at.with_timezone(&settings.timezone).fixed_offset(),
        description: tx.description.clone(),
        amount_minor: tx.amount_minor,
        account_id: map_account_id(tx.account_id),
        to_account_id: tx.to_account_id.map(map_account_id),
        kind: map_kind(tx.kind),
        split: map_split(tx.split),
        is_settled: tx.is_settled,
        settlement_id: tx.settlement_id,
        carried_from: tx.carried_from,
        locked: tx.is_locked(),
    }
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<TransactionList>,
) -> Json<TransactionListResponse> {
    let engine = state.engine.lock().await;
    let filter = engine_filter(query.filter.unwrap_or_default());
    let transactions = engine
        .history(filter)
        .into_iter()
        .map(|tx| view(tx, engine.settings()))
        .collect();

    Json(TransactionListResponse { transactions })
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let draft = engine::TransactionDraft {
        kind: engine_kind(payload.kind),
        split: payload.split.map_or(SplitType::MeOnly, engine_split),
        amount_minor: payload.amount_minor,
        description: payload.description,
        account_id: engine_account_id(payload.account_id),
        to_account_id: payload.to_account_id.map(engine_account_id),
        occurred_at: occurred_at(payload.occurred_at),
    };

    let mut engine = state.engine.lock().await;
    let id = engine.create_transaction(draft).await?;
    Ok((StatusCode::CREATED, Json(TransactionCreated { id })))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<StatusCode, ServerError> {
    let edit = engine::TransactionEdit {
        amount_minor: payload.amount_minor,
        description: payload.description,
        occurred_at: payload.occurred_at.with_timezone(&Utc),
    };

    let mut engine = state.engine.lock().await;
    engine.edit_transaction(id, edit).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let mut engine = state.engine.lock().await;
    engine.delete_transaction(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn transfer_new(
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let mut engine = state.engine.lock().await;
    let id = engine
        .transfer(
            payload.amount_minor,
            engine_account_id(payload.from),
            engine_account_id(payload.to),
            occurred_at(payload.occurred_at),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(TransactionCreated { id })))
}

pub async fn deposit_new(
    State(state): State<ServerState>,
    Json(payload): Json<DepositNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let mut engine = state.engine.lock().await;
    let id = engine
        .counterparty_deposit(occurred_at(payload.occurred_at))
        .await?;
    Ok((StatusCode::CREATED, Json(TransactionCreated { id })))
}
