use chrono::{Duration, NaiveDate};
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::{ejson, Record, Repository};

use crate::models::{Appointment, AppointmentError, CreateAppointmentRequest};
use crate::services::ConflictDetectionService;

pub struct AppointmentService {
    appointments: Repository<Appointment>,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            appointments: Repository::new(config),
        }
    }

    async fn check_request(
        &self,
        request: &CreateAppointmentRequest,
        exclude_appointment_id: Option<i64>,
    ) -> Result<(), AppointmentError> {
        Appointment::validate(request).map_err(AppointmentError::InvalidTime)?;
        if !request.is_walkin {
            ConflictDetectionService::new(&self.appointments)
                .ensure_available(
                    request.staff_id,
                    request.scheduled_start,
                    request.scheduled_end,
                    exclude_appointment_id,
                )
                .await?;
        }
        Ok(())
    }

    pub async fn book(&self, request: CreateAppointmentRequest) -> Result<Appointment, AppointmentError> {
        self.check_request(&request, None).await?;
        let appointment = self.appointments.create(request).await?;
        info!(
            "Booked appointment {} for patient {} with staff {}",
            appointment.appointment_id, appointment.patient_id, appointment.staff_id
        );
        Ok(appointment)
    }

    pub async fn reschedule(
        &self,
        appointment_id: i64,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        self.check_request(&request, Some(appointment_id)).await?;
        self.appointments
            .replace(appointment_id, request)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn for_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self
            .appointments
            .find_sorted(json!({ "patient_id": patient_id }), json!({ "scheduled_start": 1 }), None)
            .await?;
        Ok(appointments)
    }

    pub async fn for_staff(
        &self,
        staff_id: i64,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching appointments for staff {} on {:?}", staff_id, date);
        let filter = match date.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            Some(day_start) => json!({
                "$and": [
                    { "staff_id": staff_id },
                    ejson::date_range_expr("scheduled_start", day_start, day_start + Duration::days(1))
                ]
            }),
            None => json!({ "staff_id": staff_id }),
        };
        let appointments = self
            .appointments
            .find_sorted(filter, json!({ "scheduled_start": 1 }), None)
            .await?;
        Ok(appointments)
    }
}
