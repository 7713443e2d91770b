use std::collections::HashSet;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{repository::decode_all, Record, Repository, StoreClient};
use shared_models::dates;

use crate::models::{Drug, Prescription, PrescriptionSummary, Visit};

const PATIENT_COLLECTION: &str = "Patient";
const STAFF_COLLECTION: &str = "Staff";
const RECENT_PRESCRIPTIONS: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct PrescriptionRow {
    pub prescription_id: i64,
    #[serde(default)]
    pub dosage_instruction: Option<String>,
    #[serde(default, deserialize_with = "dates::option_datetime")]
    pub dispensed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub patient_first_name: Option<String>,
    #[serde(default)]
    pub patient_last_name: Option<String>,
    #[serde(default)]
    pub drug_name: Option<String>,
}

pub fn summarize(rows: Vec<PrescriptionRow>) -> Vec<PrescriptionSummary> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.prescription_id))
        .map(|row| {
            let name = format!(
                "{} {}",
                row.patient_first_name.unwrap_or_default(),
                row.patient_last_name.unwrap_or_default()
            );
            let name = name.trim();
            PrescriptionSummary {
                prescription_id: row.prescription_id,
                patient_name: if name.is_empty() { "Unknown Patient".to_string() } else { name.to_string() },
                drug_name: row
                    .drug_name
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "Unknown Drug".to_string()),
                dosage: row.dosage_instruction.unwrap_or_default(),
                dispensed_at: row.dispensed_at,
            }
        })
        .collect()
}

pub struct PharmacyService {
    client: StoreClient,
}

impl PharmacyService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: StoreClient::new(config),
        }
    }

    pub async fn for_visit(&self, visit_id: i64) -> Result<Vec<Prescription>> {
        Repository::<Prescription>::with_client(self.client.clone())
            .find_by(json!({ "visit_id": visit_id }))
            .await
    }

    /// Latest prescriptions with patient and drug names resolved.
    pub async fn recent(&self) -> Result<Vec<PrescriptionSummary>> {
        let pipeline = vec![
            json!({ "$sort": { "prescription_id": -1 } }),
            json!({ "$limit": RECENT_PRESCRIPTIONS }),
            json!({
                "$lookup": {
                    "from": PATIENT_COLLECTION,
                    "localField": "patient_id",
                    "foreignField": "patient_id",
                    "as": "patient"
                }
            }),
            json!({
                "$lookup": {
                    "from": Drug::COLLECTION,
                    "localField": "drug_id",
                    "foreignField": "drug_id",
                    "as": "drug"
                }
            }),
            json!({
                "$project": {
                    "prescription_id": 1,
                    "dosage_instruction": 1,
                    "dispensed_at": 1,
                    "patient_first_name": { "$first": "$patient.first_name" },
                    "patient_last_name": { "$first": "$patient.last_name" },
                    "drug_name": { "$first": "$drug.brand_name" }
                }
            }),
        ];
        let rows = self.client.aggregate(Prescription::COLLECTION, pipeline).await?;
        Ok(summarize(decode_all(rows)?))
    }

    /// The prescription with its patient, drug, visit and dispensing staff.
    /// The patient falls back to the visit's patient when the prescription
    /// does not name one.
    pub async fn details(&self, prescription_id: i64) -> Result<Option<Value>> {
        let Some(prescription) = self
            .client
            .find_one(Prescription::COLLECTION, json!({ "prescription_id": prescription_id }))
            .await?
        else {
            return Ok(None);
        };
        let record: Prescription = serde_json::from_value(prescription.clone())?;
        debug!("Resolving details for prescription {}", prescription_id);

        let (drug, visit, dispensed_by) = futures::try_join!(
            self.client.find_one(Drug::COLLECTION, json!({ "drug_id": record.drug_id })),
            self.client.find_one(Visit::COLLECTION, json!({ "visit_id": record.visit_id })),
            self.optional_lookup(STAFF_COLLECTION, "staff_id", record.dispensed_by),
        )?;

        let patient_id = record.patient_id.or_else(|| {
            visit
                .as_ref()
                .and_then(|v| v.get("patient_id"))
                .and_then(Value::as_i64)
        });
        let patient = self
            .optional_lookup(PATIENT_COLLECTION, "patient_id", patient_id)
            .await?;

        Ok(Some(json!({
            "prescription": prescription,
            "patient": patient,
            "drug": drug,
            "visit": visit,
            "dispensed_by": dispensed_by
        })))
    }

    async fn optional_lookup(&self, collection: &str, field: &str, id: Option<i64>) -> Result<Option<Value>> {
        match id {
            Some(id) => self.client.find_one(collection, json!({ field: id })).await,
            None => Ok(None),
        }
    }
}
