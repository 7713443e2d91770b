use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{ejson, repository::decode_all, Record, Repository};

use crate::models::{CreateShiftRequest, ScheduledShift, Staff, StaffShift};

pub struct ScheduleService {
    shifts: Repository<StaffShift>,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            shifts: Repository::new(config),
        }
    }

    pub async fn create_shift(&self, request: CreateShiftRequest) -> Result<StaffShift> {
        self.shifts.create(request).await
    }

    /// Every shift on `day` with the staff member's name, earliest first.
    pub async fn daily_master(&self, day: NaiveDate) -> Result<Vec<ScheduledShift>> {
        debug!("Building master schedule for {}", day);
        let start = day.and_hms_opt(0, 0, 0).unwrap_or_default();
        let pipeline = vec![
            json!({ "$match": ejson::date_range_expr("shift_date", start, start + Duration::days(1)) }),
            json!({
                "$lookup": {
                    "from": Staff::COLLECTION,
                    "localField": "staff_id",
                    "foreignField": "staff_id",
                    "as": "staff"
                }
            }),
            json!({ "$unwind": { "path": "$staff", "preserveNullAndEmptyArrays": true } }),
            json!({
                "$addFields": {
                    "staff_name": {
                        "$cond": [
                            { "$ifNull": ["$staff", false] },
                            { "$concat": ["$staff.first_name", " ", "$staff.last_name"] },
                            null
                        ]
                    },
                    "role": "$staff.role"
                }
            }),
            json!({ "$project": { "staff": 0 } }),
            json!({ "$sort": { "start_time": 1, "shift_id": 1 } }),
        ];

        let rows = self
            .shifts
            .client()
            .aggregate(StaffShift::COLLECTION, pipeline)
            .await?;
        decode_all(rows)
    }
}
