use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDate};
use serde_json::Value;

use shared_config::AppConfig;
use shared_database::Record;
use shared_models::{dates::parse_date, error::AppError};

use crate::models::*;
use crate::services::{
    recovery::StayUpdate, CatalogService, EncounterService, PharmacyService, RecoveryService,
};

fn db_error(e: anyhow::Error) -> AppError {
    AppError::Database(e.to_string())
}

fn path_date(raw: &str) -> Result<NaiveDate, AppError> {
    parse_date(raw).ok_or_else(|| {
        AppError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
    })
}

// ==============================================================================
// VISITS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_patient_visits(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<Visit>>, AppError> {
    let visits = EncounterService::new(&config)
        .visits_for_patient(patient_id)
        .await
        .map_err(db_error)?;
    Ok(Json(visits))
}

#[axum::debug_handler]
pub async fn add_visit_diagnosis(
    State(config): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
    Json(request): Json<AddVisitDiagnosisRequest>,
) -> Result<(StatusCode, Json<VisitDiagnosis>), AppError> {
    let link = EncounterService::new(&config)
        .add_diagnosis(visit_id, request)
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(link)))
}

#[axum::debug_handler]
pub async fn get_visit_diagnoses(
    State(config): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
) -> Result<Json<Vec<VisitDiagnosis>>, AppError> {
    let links = EncounterService::new(&config)
        .diagnoses_for_visit(visit_id)
        .await
        .map_err(db_error)?;
    Ok(Json(links))
}

#[axum::debug_handler]
pub async fn remove_visit_diagnosis(
    State(config): State<Arc<AppConfig>>,
    Path((visit_id, diagnosis_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let removed = EncounterService::new(&config)
        .remove_diagnosis(visit_id, diagnosis_id)
        .await
        .map_err(db_error)?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Visit diagnosis"))
    }
}

#[axum::debug_handler]
pub async fn add_visit_procedure(
    State(config): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
    Json(request): Json<AddVisitProcedureRequest>,
) -> Result<(StatusCode, Json<VisitProcedure>), AppError> {
    if matches!(request.fee, Some(fee) if fee < 0.0) {
        return Err(AppError::BadRequest("fee must not be negative".to_string()));
    }
    let link = EncounterService::new(&config)
        .add_procedure(visit_id, request)
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(link)))
}

#[axum::debug_handler]
pub async fn get_visit_procedures(
    State(config): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
) -> Result<Json<Vec<VisitProcedure>>, AppError> {
    let links = EncounterService::new(&config)
        .procedures_for_visit(visit_id)
        .await
        .map_err(db_error)?;
    Ok(Json(links))
}

#[axum::debug_handler]
pub async fn remove_visit_procedure(
    State(config): State<Arc<AppConfig>>,
    Path((visit_id, procedure_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let removed = EncounterService::new(&config)
        .remove_procedure(visit_id, procedure_id)
        .await
        .map_err(db_error)?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Visit procedure"))
    }
}

// ==============================================================================
// CATALOG SEARCH
// ==============================================================================

#[axum::debug_handler]
pub async fn search_diagnoses(
    State(config): State<Arc<AppConfig>>,
    Path(code): Path<String>,
) -> Result<Json<Vec<Diagnosis>>, AppError> {
    let diagnoses = CatalogService::new(&config)
        .diagnoses_by_code(&code)
        .await
        .map_err(db_error)?;
    Ok(Json(diagnoses))
}

#[axum::debug_handler]
pub async fn search_drugs(
    State(config): State<Arc<AppConfig>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Drug>>, AppError> {
    let drugs = CatalogService::new(&config)
        .drugs_by_name(&name)
        .await
        .map_err(db_error)?;
    Ok(Json(drugs))
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_visit_prescriptions(
    State(config): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
) -> Result<Json<Vec<Prescription>>, AppError> {
    let prescriptions = PharmacyService::new(&config)
        .for_visit(visit_id)
        .await
        .map_err(db_error)?;
    Ok(Json(prescriptions))
}

#[axum::debug_handler]
pub async fn list_recent_prescriptions(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Vec<PrescriptionSummary>>, AppError> {
    let summaries = PharmacyService::new(&config).recent().await.map_err(db_error)?;
    Ok(Json(summaries))
}

#[axum::debug_handler]
pub async fn get_prescription_details(
    State(config): State<Arc<AppConfig>>,
    Path(prescription_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    PharmacyService::new(&config)
        .details(prescription_id)
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| AppError::not_found(Prescription::LABEL))
}

// ==============================================================================
// LAB TESTS & DELIVERIES
// ==============================================================================

#[axum::debug_handler]
pub async fn get_visit_lab_tests(
    State(config): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
) -> Result<Json<Vec<LabTestOrder>>, AppError> {
    let tests = EncounterService::new(&config)
        .lab_tests_for_visit(visit_id)
        .await
        .map_err(db_error)?;
    Ok(Json(tests))
}

#[axum::debug_handler]
pub async fn get_lab_tests_by_date(
    State(config): State<Arc<AppConfig>>,
    Path(date): Path<String>,
) -> Result<Json<Vec<LabTestOrder>>, AppError> {
    let day = path_date(&date)?;
    let tests = EncounterService::new(&config).lab_tests_on(day).await.map_err(db_error)?;
    Ok(Json(tests))
}

#[axum::debug_handler]
pub async fn get_lab_tests_today(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Vec<LabTestOrder>>, AppError> {
    let tests = EncounterService::new(&config)
        .lab_tests_on(Local::now().date_naive())
        .await
        .map_err(db_error)?;
    Ok(Json(tests))
}

#[axum::debug_handler]
pub async fn get_visit_delivery(
    State(config): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
) -> Result<Json<Delivery>, AppError> {
    EncounterService::new(&config)
        .delivery_for_visit(visit_id)
        .await
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| AppError::not_found(Delivery::LABEL))
}

#[axum::debug_handler]
pub async fn get_deliveries_by_date(
    State(config): State<Arc<AppConfig>>,
    Path(date): Path<String>,
) -> Result<Json<Vec<DeliveryEntry>>, AppError> {
    let day = path_date(&date)?;
    let deliveries = EncounterService::new(&config).deliveries_on(day).await.map_err(db_error)?;
    Ok(Json(deliveries))
}

#[axum::debug_handler]
pub async fn get_deliveries_today(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Vec<DeliveryEntry>>, AppError> {
    let deliveries = EncounterService::new(&config)
        .deliveries_on(Local::now().date_naive())
        .await
        .map_err(db_error)?;
    Ok(Json(deliveries))
}

// ==============================================================================
// RECOVERY
// ==============================================================================

#[axum::debug_handler]
pub async fn update_recovery_stay(
    State(config): State<Arc<AppConfig>>,
    Path(stay_id): Path<i64>,
    Json(request): Json<UpdateRecoveryStayRequest>,
) -> Result<Json<RecoveryStay>, AppError> {
    match RecoveryService::new(&config)
        .update_stay(stay_id, request)
        .await
        .map_err(db_error)?
    {
        StayUpdate::Updated(stay) => Ok(Json(stay)),
        StayUpdate::Missing => Err(AppError::not_found(RecoveryStay::LABEL)),
        StayUpdate::Invalid(message) => Err(AppError::BadRequest(message)),
    }
}

#[axum::debug_handler]
pub async fn get_stay_observations(
    State(config): State<Arc<AppConfig>>,
    Path(stay_id): Path<i64>,
) -> Result<Json<Vec<RecoveryObservation>>, AppError> {
    let observations = RecoveryService::new(&config)
        .observations_for_stay(stay_id)
        .await
        .map_err(db_error)?;
    Ok(Json(observations))
}
