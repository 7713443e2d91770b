use chrono::NaiveDateTime;
use serde_json::json;
use tracing::{debug, warn};

use shared_database::{ejson, Repository};

use crate::models::{Appointment, AppointmentError};

pub struct ConflictDetectionService<'a> {
    appointments: &'a Repository<Appointment>,
}

impl<'a> ConflictDetectionService<'a> {
    pub fn new(appointments: &'a Repository<Appointment>) -> Self {
        Self { appointments }
    }

    /// Fail when `staff_id` already has a scheduled, non-cancelled
    /// appointment overlapping `[start, end)`. Walk-ins never conflict.
    pub async fn ensure_available(
        &self,
        staff_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude_appointment_id: Option<i64>,
    ) -> Result<(), AppointmentError> {
        debug!("Checking conflicts for staff {} from {} to {}", staff_id, start, end);

        let filter = json!({
            "$and": [
                { "staff_id": staff_id },
                { "is_walkin": { "$ne": true } },
                ejson::overlap_expr("scheduled_start", "scheduled_end", start, end)
            ]
        });
        let existing = self.appointments.find_by(filter).await?;

        match find_conflict(&existing, start, end, exclude_appointment_id) {
            Some(conflicting) => {
                warn!("Conflict detected for staff {} with appointment {}", staff_id, conflicting.appointment_id);
                Err(AppointmentError::ConflictDetected {
                    staff_id,
                    appointment_id: conflicting.appointment_id,
                })
            }
            None => Ok(()),
        }
    }
}

pub fn appointments_overlap(
    start1: NaiveDateTime,
    end1: NaiveDateTime,
    start2: NaiveDateTime,
    end2: NaiveDateTime,
) -> bool {
    start1 < end2 && start2 < end1
}

pub fn find_conflict<'a>(
    existing: &'a [Appointment],
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_appointment_id: Option<i64>,
) -> Option<&'a Appointment> {
    existing.iter().find(|appointment| {
        Some(appointment.appointment_id) != exclude_appointment_id
            && !appointment.is_walkin
            && !appointment.is_cancelled()
            && appointments_overlap(start, end, appointment.scheduled_start, appointment.scheduled_end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, NaiveDate};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(hour, minute, 0).unwrap()
    }

    fn booked(id: i64, start: NaiveDateTime, end: NaiveDateTime) -> Appointment {
        Appointment {
            appointment_id: id,
            patient_id: 1,
            staff_id: 2,
            scheduled_start: start,
            scheduled_end: end,
            is_walkin: false,
            status: Some("scheduled".to_string()),
            reason: None,
        }
    }

    #[test]
    fn touching_slots_do_not_overlap() {
        assert!(!appointments_overlap(at(10, 0), at(10, 10), at(10, 10), at(10, 20)));
        assert!(appointments_overlap(at(10, 0), at(10, 15), at(10, 10), at(10, 20)));
        assert!(appointments_overlap(at(9, 0), at(11, 0), at(10, 0), at(10, 10)));
    }

    #[test]
    fn ignores_self_walkins_and_cancellations() {
        let mut walkin = booked(2, at(10, 0), at(10, 30));
        walkin.is_walkin = true;
        let mut cancelled = booked(3, at(10, 0), at(10, 30));
        cancelled.status = Some("cancelled".to_string());
        let existing = vec![booked(1, at(10, 0), at(10, 30)), walkin, cancelled];

        assert!(find_conflict(&existing, at(10, 5), at(10, 20), Some(1)).is_none());
        assert_matches!(
            find_conflict(&existing, at(10, 5), at(10, 20), None),
            Some(Appointment { appointment_id: 1, .. })
        );
    }

    #[test]
    fn long_booking_from_an_earlier_day_conflicts() {
        let existing = vec![booked(4, at(8, 0) - Duration::days(2), at(8, 0) + Duration::days(1))];

        assert_matches!(
            find_conflict(&existing, at(10, 15), at(10, 45), None),
            Some(Appointment { appointment_id: 4, .. })
        );
    }
}
