use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use shared_database::Record;
use shared_models::{dates, error::AppError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: i64,
    pub patient_id: i64,
    pub staff_id: i64,
    #[serde(deserialize_with = "dates::datetime")]
    pub scheduled_start: NaiveDateTime,
    #[serde(deserialize_with = "dates::datetime")]
    pub scheduled_end: NaiveDateTime,
    #[serde(default)]
    pub is_walkin: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Appointment {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.status.as_deref(), Some("cancelled" | "canceled"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: i64,
    pub staff_id: i64,
    #[serde(deserialize_with = "dates::datetime")]
    pub scheduled_start: NaiveDateTime,
    #[serde(deserialize_with = "dates::datetime")]
    pub scheduled_end: NaiveDateTime,
    #[serde(default)]
    pub is_walkin: bool,
    pub status: Option<String>,
    pub reason: Option<String>,
}

impl Record for Appointment {
    const COLLECTION: &'static str = "Appointment";
    const ID_FIELD: &'static str = "appointment_id";
    const LABEL: &'static str = "Appointment";
    type Create = CreateAppointmentRequest;

    fn from_create(id: i64, request: CreateAppointmentRequest) -> Self {
        Self {
            appointment_id: id,
            patient_id: request.patient_id,
            staff_id: request.staff_id,
            scheduled_start: request.scheduled_start,
            scheduled_end: request.scheduled_end,
            is_walkin: request.is_walkin,
            status: request.status,
            reason: request.reason,
        }
    }

    fn id(&self) -> i64 {
        self.appointment_id
    }

    fn validate(request: &CreateAppointmentRequest) -> Result<(), String> {
        if request.scheduled_end <= request.scheduled_start {
            return Err("scheduled_end must be after scheduled_start".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffAppointmentsQuery {
    #[serde(default, deserialize_with = "dates::option_date")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Staff member {staff_id} already has appointment {appointment_id} at this time")]
    ConflictDetected { staff_id: i64, appointment_id: i64 },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(error: anyhow::Error) -> Self {
        AppointmentError::DatabaseError(error.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound => AppError::NotFound(error.to_string()),
            AppointmentError::InvalidTime(msg) => AppError::BadRequest(msg),
            AppointmentError::ConflictDetected { .. } => AppError::Conflict(error.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
