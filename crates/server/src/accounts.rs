//! Accounts API endpoints

use api_types::{
    AccountId as ApiAccountId,
    account::{AccountView, AccountsResponse, BalanceUpdate},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{ServerError, server::ServerState};

pub(crate) fn map_account_id(id: engine::AccountId) -> ApiAccountId {
    match id {
        engine::AccountId::Cash => ApiAccountId::Cash,
        engine::AccountId::PrimaryBank => ApiAccountId::PrimaryBank,
        engine::AccountId::SecondaryBank => ApiAccountId::SecondaryBank,
        engine::AccountId::Savings => ApiAccountId::Savings,
        engine::AccountId::EarmarkedSavings => ApiAccountId::EarmarkedSavings,
    }
}

pub(crate) fn engine_account_id(id: ApiAccountId) -> engine::AccountId {
    match id {
        ApiAccountId::Cash => engine::AccountId::Cash,
        ApiAccountId::PrimaryBank => engine::AccountId::PrimaryBank,
        ApiAccountId::SecondaryBank => engine::AccountId::SecondaryBank,
        ApiAccountId::Savings => engine::AccountId::Savings,
        ApiAccountId::EarmarkedSavings => engine::AccountId::EarmarkedSavings,
    }
}

pub async fn list(State(state): State<ServerState>) -> Result<Json<AccountsResponse>, ServerError> {
    let engine = state.engine.lock().await;
    let accounts = engine
        .accounts()
        .map(|account| AccountView {
            id: map_account_id(account.id),
            name: account.name.clone(),
            color: account.color.clone(),
            icon: account.icon.clone(),
            balance_minor: account.balance,
        })
        .collect();

    Ok(Json(AccountsResponse {
        accounts,
        total_balance_minor: engine.total_balance()?,
    }))
}

/// Overrides the balance of the account named in the path, e.g. `CASH`.
pub async fn set_balance(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<BalanceUpdate>,
) -> Result<StatusCode, ServerError> {
    let account_id = engine::AccountId::try_from(id.as_str())?;
    let mut engine = state.engine.lock().await;
    engine
        .set_account_balance(account_id, payload.balance_minor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
