use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::Record;
use shared_models::{dates::parse_date, error::AppError};

use crate::models::{
    check_day_of_week, CreateAssignmentRequest, CreateShiftRequest, DailyScheduleQuery,
    ScheduledShift, Staff, StaffAssignment, StaffListQuery, StaffShift, UpdateAssignmentRequest,
};
use crate::services::{CoverageService, ScheduleService, StaffService};

#[axum::debug_handler]
pub async fn list_staff(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<StaffListQuery>,
) -> Result<Json<Vec<Staff>>, AppError> {
    let staff = StaffService::new(&config)
        .list(&query)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(Json(staff))
}

#[axum::debug_handler]
pub async fn deactivate_staff(
    State(config): State<Arc<AppConfig>>,
    Path(staff_id): Path<i64>,
) -> Result<Json<Staff>, AppError> {
    StaffService::new(&config)
        .deactivate(staff_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .map(Json)
        .ok_or_else(|| AppError::not_found(Staff::LABEL))
}

#[axum::debug_handler]
pub async fn create_shift(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreateShiftRequest>,
) -> Result<(StatusCode, Json<StaffShift>), AppError> {
    StaffShift::validate(&request).map_err(AppError::BadRequest)?;
    let shift = ScheduleService::new(&config)
        .create_shift(request)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(shift)))
}

#[axum::debug_handler]
pub async fn daily_master_schedule(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<DailyScheduleQuery>,
) -> Result<Json<Vec<ScheduledShift>>, AppError> {
    let day = query
        .date
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| AppError::BadRequest("date query parameter required (YYYY-MM-DD)".to_string()))?;

    let shifts = ScheduleService::new(&config)
        .daily_master(day)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(Json(shifts))
}

type Envelope = (StatusCode, Json<Value>);

fn envelope_error(status: StatusCode, message: impl ToString) -> Envelope {
    (status, Json(json!({ "status": "error", "message": message.to_string() })))
}

fn assignment_not_found(assignment_id: i64) -> Envelope {
    envelope_error(
        StatusCode::NOT_FOUND,
        format!("Assignment with id {} not found", assignment_id),
    )
}

#[axum::debug_handler]
pub async fn list_assignments(State(config): State<Arc<AppConfig>>) -> Envelope {
    match CoverageService::new(&config).all().await {
        Ok(assignments) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "assignments": assignments })),
        ),
        Err(e) => envelope_error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

#[axum::debug_handler]
pub async fn create_assignment(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreateAssignmentRequest>,
) -> Envelope {
    if let Err(message) = StaffAssignment::validate(&request) {
        return envelope_error(StatusCode::BAD_REQUEST, message);
    }
    match CoverageService::new(&config).create(request).await {
        Ok(assignment) => (
            StatusCode::CREATED,
            Json(json!({
                "status": "success",
                "message": "Assignment added",
                "assignment": assignment
            })),
        ),
        Err(e) => envelope_error(StatusCode::BAD_REQUEST, e),
    }
}

#[axum::debug_handler]
pub async fn update_assignment(
    State(config): State<Arc<AppConfig>>,
    Path(assignment_id): Path<i64>,
    Json(request): Json<UpdateAssignmentRequest>,
) -> Envelope {
    if let Some(Err(message)) = request.day_of_week.map(check_day_of_week) {
        return envelope_error(StatusCode::BAD_REQUEST, message);
    }
    match CoverageService::new(&config).update(assignment_id, &request).await {
        Ok(Some(assignment)) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "message": "Assignment updated",
                "assignment": assignment
            })),
        ),
        Ok(None) => assignment_not_found(assignment_id),
        Err(e) => envelope_error(StatusCode::BAD_REQUEST, e),
    }
}

#[axum::debug_handler]
pub async fn delete_assignment(
    State(config): State<Arc<AppConfig>>,
    Path(assignment_id): Path<i64>,
) -> Envelope {
    match CoverageService::new(&config).delete(assignment_id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "message": format!("Assignment with id {} deleted", assignment_id)
            })),
        ),
        Ok(false) => assignment_not_found(assignment_id),
        Err(e) => envelope_error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}
