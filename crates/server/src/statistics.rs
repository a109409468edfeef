//! Statistics API endpoints

use api_types::stats::{DailyStat, MonthlyStatistic, StatsQuery};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{Datelike, Utc};

use crate::{ServerError, server::ServerState};

/// Income and expenses of a month, current month by default.
pub async fn get_stats(
    State(state): State<ServerState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<MonthlyStatistic>, ServerError> {
    let engine = state.engine.lock().await;
    let today = Utc::now().with_timezone(&engine.settings().timezone);
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());

    let stats = engine.monthly_stats(year, month)?;
    Ok(Json(MonthlyStatistic {
        year: stats.year,
        month: stats.month,
        income_minor: stats.income,
        expense_minor: stats.expense,
        days: stats
            .days
            .into_iter()
            .map(|day| DailyStat {
                day: day.day,
                income_minor: day.income,
                expense_minor: day.expense,
            })
            .collect(),
    }))
}
