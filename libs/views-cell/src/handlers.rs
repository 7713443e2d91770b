use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Local;
use serde_json::{json, Value};
use tracing::info;

use shared_config::AppConfig;
use shared_models::{auth::User, error::AppError};
use shared_utils::extractor::require_admin;

use crate::definitions::{
    DAILY_CLINIC_SCHEDULE, PATIENT_CLINICAL_HISTORY, PATIENT_FINANCIAL_SUMMARY,
    STAFF_WORKLOAD_ANALYSIS, VISIT_COMPLETE_DETAILS,
};
use crate::materialize::ViewManager;
use crate::params::Params;
use crate::queries::{self, ViewQuery};
use crate::reader::ViewReader;

fn db_error(e: anyhow::Error) -> AppError {
    AppError::Database(e.to_string())
}

async fn rows(config: &AppConfig, view: &str, query: &ViewQuery) -> Result<Vec<Value>, AppError> {
    ViewReader::new(config).find(view, query).await.map_err(db_error)
}

#[axum::debug_handler]
pub async fn visit_details(
    State(config): State<Arc<AppConfig>>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, AppError> {
    let query = queries::visit_details(&params)?;
    let data = rows(&config, VISIT_COMPLETE_DETAILS, &query).await?;
    Ok(Json(json!({
        "count": data.len(),
        "data": data,
        "filters_applied": query.filters_applied
    })))
}

#[axum::debug_handler]
pub async fn patient_financials(
    State(config): State<Arc<AppConfig>>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, AppError> {
    let query = queries::patient_financials(&params)?;
    let data = rows(&config, PATIENT_FINANCIAL_SUMMARY, &query).await?;
    Ok(Json(json!({
        "count": data.len(),
        "summary": queries::financial_summary(&data),
        "data": data,
        "filters_applied": query.filters_applied
    })))
}

#[axum::debug_handler]
pub async fn staff_workload(
    State(config): State<Arc<AppConfig>>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, AppError> {
    let query = queries::staff_workload(&params)?;
    let data = rows(&config, STAFF_WORKLOAD_ANALYSIS, &query).await?;
    Ok(Json(json!({
        "count": data.len(),
        "summary": queries::workload_summary(&data),
        "data": data,
        "filters_applied": query.filters_applied
    })))
}

#[axum::debug_handler]
pub async fn clinic_schedule(
    State(config): State<Arc<AppConfig>>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, AppError> {
    let (query, day) = queries::clinic_schedule(&params, Local::now().date_naive())?;
    let data = rows(&config, DAILY_CLINIC_SCHEDULE, &query).await?;
    Ok(Json(json!({
        "count": data.len(),
        "date": day.format("%Y-%m-%d").to_string(),
        "summary": queries::schedule_summary(&data),
        "data": data,
        "filters_applied": query.filters_applied
    })))
}

#[axum::debug_handler]
pub async fn patient_history(
    State(config): State<Arc<AppConfig>>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, AppError> {
    let query = queries::patient_history(&params)?;
    let data = rows(&config, PATIENT_CLINICAL_HISTORY, &query).await?;
    Ok(Json(json!({
        "count": data.len(),
        "summary": queries::history_summary(&data),
        "data": data,
        "filters_applied": query.filters_applied
    })))
}

#[axum::debug_handler]
pub async fn views_summary(State(config): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let summary = ViewReader::new(&config)
        .summary(Local::now().date_naive())
        .await
        .map_err(db_error)?;
    Ok(Json(summary))
}

#[axum::debug_handler]
pub async fn views_status(State(config): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let status = ViewManager::new(&config).status().await.map_err(db_error)?;
    Ok(Json(json!(status)))
}

#[axum::debug_handler]
pub async fn recreate_views(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    info!("User {} requested view recreation", user.id);

    let results = ViewManager::new(&config).refresh_all().await;
    let rebuilt = results.values().filter(|ok| **ok).count();
    Ok(Json(json!({
        "message": format!("Recreated {}/{} views", rebuilt, results.len()),
        "results": results
    })))
}
