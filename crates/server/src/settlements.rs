//! Debt, bill and settlement API endpoints

use api_types::settlement::{
    BillView, DebtView, SettlementCreated, SettlementNew, SettlementViewResponse,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, transactions::view};

pub async fn debt(State(state): State<ServerState>) -> Result<Json<DebtView>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(DebtView {
        counterparty_name: engine.settings().counterparty_name.clone(),
        net_debt_minor: engine.net_debt()?,
    }))
}

pub async fn bill(State(state): State<ServerState>) -> Result<Json<BillView>, ServerError> {
    let engine = state.engine.lock().await;
    let bill = engine.bill()?;
    Ok(Json(BillView {
        items: bill
            .items
            .iter()
            .map(|tx| view(tx, engine.settings()))
            .collect(),
        net_debt_minor: bill.net_debt,
        suggested_payment_minor: bill.suggested_payment,
    }))
}

/// Settles the whole current bill against the payment received.
pub async fn settle(
    State(state): State<ServerState>,
    Json(payload): Json<SettlementNew>,
) -> Result<(StatusCode, Json<SettlementCreated>), ServerError> {
    let mut engine = state.engine.lock().await;
    let outcome = engine
        .settle_bill(payload.final_payment_minor, Utc::now())
        .await?;

    let settings = engine.settings();
    Ok((
        StatusCode::CREATED,
        Json(SettlementCreated {
            settlement_id: outcome.settlement_id,
            settlement: outcome.settlement.as_ref().map(|tx| view(tx, settings)),
            carry_forward: outcome.carry_forward.as_ref().map(|tx| view(tx, settings)),
            settled_ids: outcome.settled_ids,
            surplus_minor: outcome.surplus,
        }),
    ))
}

pub async fn view_settlement(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SettlementViewResponse>, ServerError> {
    let engine = state.engine.lock().await;
    let settlement = engine.settlement_view(id)?;
    let settings = engine.settings();

    Ok(Json(SettlementViewResponse {
        settlement_id: settlement.settlement_id,
        settlement: settlement.settlement.as_ref().map(|tx| view(tx, settings)),
        items: settlement.items.iter().map(|tx| view(tx, settings)).collect(),
        items_total_minor: settlement.items_total,
        amount_paid_minor: settlement.amount_paid,
        carry_forward: settlement
            .carry_forward
            .as_ref()
            .map(|tx| view(tx, settings)),
    }))
}

pub async fn reopen(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let mut engine = state.engine.lock().await;
    engine.reopen_settlement(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
