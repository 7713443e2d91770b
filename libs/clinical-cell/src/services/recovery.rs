use anyhow::Result;
use serde_json::json;

use shared_config::AppConfig;
use shared_database::{repository::to_document, Repository};

use crate::models::{check_discharge, RecoveryObservation, RecoveryStay, UpdateRecoveryStayRequest};

pub enum StayUpdate {
    Updated(RecoveryStay),
    Missing,
    Invalid(String),
}

pub struct RecoveryService {
    stays: Repository<RecoveryStay>,
    observations: Repository<RecoveryObservation>,
}

impl RecoveryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            stays: Repository::new(config),
            observations: Repository::new(config),
        }
    }

    pub async fn update_stay(&self, stay_id: i64, request: UpdateRecoveryStayRequest) -> Result<StayUpdate> {
        let Some(stay) = self.stays.get(stay_id).await? else {
            return Ok(StayUpdate::Missing);
        };
        if let Err(message) = check_discharge(stay.admit_time, request.discharge_time) {
            return Ok(StayUpdate::Invalid(message));
        }

        let fields = to_document(&request)?;
        if fields.is_empty() {
            return Ok(StayUpdate::Updated(stay));
        }
        Ok(match self.stays.update_fields(stay_id, fields).await? {
            Some(updated) => StayUpdate::Updated(updated),
            None => StayUpdate::Missing,
        })
    }

    pub async fn observations_for_stay(&self, stay_id: i64) -> Result<Vec<RecoveryObservation>> {
        self.observations
            .find_sorted(json!({ "stay_id": stay_id }), json!({ "observed_at": 1 }), None)
            .await
    }
}
