use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{Appointment, CreateAppointmentRequest, StaffAppointmentsQuery};
use crate::services::AppointmentService;

#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = AppointmentService::new(&config).book(request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = AppointmentService::new(&config)
        .reschedule(appointment_id, request)
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = AppointmentService::new(&config).for_patient(patient_id).await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_staff_appointments(
    State(config): State<Arc<AppConfig>>,
    Path(staff_id): Path<i64>,
    Query(query): Query<StaffAppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = AppointmentService::new(&config)
        .for_staff(staff_id, query.date)
        .await?;
    Ok(Json(appointments))
}
