use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use shared_database::Record;
use shared_models::{dates, ListQuery};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub staff_id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStaffRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Record for Staff {
    const COLLECTION: &'static str = "Staff";
    const ID_FIELD: &'static str = "staff_id";
    const LABEL: &'static str = "Staff";
    type Create = CreateStaffRequest;

    fn from_create(id: i64, request: CreateStaffRequest) -> Self {
        Self {
            staff_id: id,
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone: request.phone,
            role: request.role,
            active: request.active,
        }
    }

    fn id(&self) -> i64 {
        self.staff_id
    }

    fn validate(request: &CreateStaffRequest) -> Result<(), String> {
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err("first_name and last_name are required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffListQuery {
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    pub active_only: Option<bool>,
}

impl StaffListQuery {
    pub fn paging(&self) -> ListQuery {
        ListQuery {
            skip: self.skip,
            limit: self.limit,
        }
    }
}

/// One staff member's block of work on a given day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffShift {
    pub shift_id: i64,
    pub staff_id: i64,
    #[serde(deserialize_with = "dates::date")]
    pub shift_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub area: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShiftRequest {
    pub staff_id: i64,
    #[serde(deserialize_with = "dates::date")]
    pub shift_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub area: Option<String>,
}

impl Record for StaffShift {
    const COLLECTION: &'static str = "StaffShift";
    const ID_FIELD: &'static str = "shift_id";
    const LABEL: &'static str = "Shift";
    type Create = CreateShiftRequest;

    fn from_create(id: i64, request: CreateShiftRequest) -> Self {
        Self {
            shift_id: id,
            staff_id: request.staff_id,
            shift_date: request.shift_date,
            start_time: request.start_time,
            end_time: request.end_time,
            area: request.area,
        }
    }

    fn id(&self) -> i64 {
        self.shift_id
    }

    fn validate(request: &CreateShiftRequest) -> Result<(), String> {
        if request.end_time <= request.start_time {
            return Err("end_time must be after start_time".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledShift {
    #[serde(flatten)]
    pub shift: StaffShift,
    #[serde(default)]
    pub staff_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyScheduleQuery {
    pub date: Option<String>,
}

/// Recurring weekly coverage slot. `day_of_week` runs 0 (Monday) to 6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffAssignment {
    pub assignment_id: i64,
    pub staff_id: i64,
    pub day_of_week: u8,
    pub shift: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssignmentRequest {
    pub staff_id: i64,
    pub day_of_week: u8,
    pub shift: String,
    pub area: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAssignmentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub fn check_day_of_week(day: u8) -> Result<(), String> {
    if day > 6 {
        return Err(format!("day_of_week must be between 0 and 6, got {}", day));
    }
    Ok(())
}

impl Record for StaffAssignment {
    const COLLECTION: &'static str = "StaffAssignment";
    const ID_FIELD: &'static str = "assignment_id";
    const LABEL: &'static str = "Assignment";
    type Create = CreateAssignmentRequest;

    fn from_create(id: i64, request: CreateAssignmentRequest) -> Self {
        Self {
            assignment_id: id,
            staff_id: request.staff_id,
            day_of_week: request.day_of_week,
            shift: request.shift,
            area: request.area,
            notes: request.notes,
        }
    }

    fn id(&self) -> i64 {
        self.assignment_id
    }

    fn validate(request: &CreateAssignmentRequest) -> Result<(), String> {
        check_day_of_week(request.day_of_week)?;
        if request.shift.trim().is_empty() {
            return Err("shift is required".to_string());
        }
        Ok(())
    }
}
