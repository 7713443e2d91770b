use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{Patient, PatientNameQuery};
use crate::services::PatientSearchService;

#[axum::debug_handler]
pub async fn search_patients_by_name(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<PatientNameQuery>,
) -> Result<Json<Vec<Patient>>, AppError> {
    let filter = PatientSearchService::name_filter(&query).ok_or_else(|| {
        AppError::BadRequest("At least one of first_name or last_name is required".to_string())
    })?;

    let patients = PatientSearchService::new(&config)
        .search_by_name(filter)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(patients))
}
