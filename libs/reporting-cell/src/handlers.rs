use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use shared_config::AppConfig;
use shared_models::{dates::parse_date, error::AppError};

use crate::models::{
    DayQuery, DeliveryLogEntry, MonthWindow, MonthlyActivity, MonthlyStatement,
    OutstandingBalance, PeriodQuery,
};
use crate::services::{ReportService, StatementService};

fn month_window(query: &PeriodQuery) -> Result<MonthWindow, AppError> {
    MonthWindow::from_query(query)
        .ok_or_else(|| AppError::BadRequest("Month and Year required".to_string()))
}

#[axum::debug_handler]
pub async fn monthly_statements(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<MonthlyStatement>, AppError> {
    let window = month_window(&query)?;
    let statement = StatementService::new(&config)
        .monthly(&window)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(Json(statement))
}

#[axum::debug_handler]
pub async fn outstanding_balances(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Vec<OutstandingBalance>>, AppError> {
    let balances = ReportService::new(&config)
        .outstanding_balances()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(Json(balances))
}

#[axum::debug_handler]
pub async fn monthly_activity(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<MonthlyActivity>, AppError> {
    let window = month_window(&query)?;
    let report = ReportService::new(&config)
        .monthly_activity(&window)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn daily_delivery_log(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<DeliveryLogEntry>>, AppError> {
    let day = query
        .date
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| AppError::BadRequest("date query parameter required (YYYY-MM-DD)".to_string()))?;

    let log = ReportService::new(&config)
        .daily_delivery_log(day)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(Json(log))
}
