use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{
    ejson,
    repository::{decode_all, to_document},
    StoreClient, FindOptions, Record, Repository,
};

use crate::models::{
    AddVisitDiagnosisRequest, AddVisitProcedureRequest, Delivery, DeliveryEntry, LabTestOrder,
    Procedure, Visit, VisitDiagnosis, VisitProcedure, VISIT_DIAGNOSIS_COLLECTION,
    VISIT_PROCEDURE_COLLECTION,
};

/// Visit-scoped records: diagnoses, procedures, lab orders and deliveries.
pub struct EncounterService {
    client: StoreClient,
}

impl EncounterService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: StoreClient::new(config),
        }
    }

    pub async fn visits_for_patient(&self, patient_id: i64) -> Result<Vec<Visit>> {
        Repository::<Visit>::with_client(self.client.clone())
            .find_sorted(json!({ "patient_id": patient_id }), json!({ "start_time": -1 }), None)
            .await
    }

    pub async fn add_diagnosis(
        &self,
        visit_id: i64,
        request: AddVisitDiagnosisRequest,
    ) -> Result<VisitDiagnosis> {
        let link = VisitDiagnosis {
            visit_id,
            diagnosis_id: request.diagnosis_id,
            is_primary: request.is_primary,
        };
        self.client
            .insert_one(VISIT_DIAGNOSIS_COLLECTION, serde_json::Value::Object(to_document(&link)?))
            .await?;
        Ok(link)
    }

    pub async fn diagnoses_for_visit(&self, visit_id: i64) -> Result<Vec<VisitDiagnosis>> {
        let rows = self
            .client
            .find(
                VISIT_DIAGNOSIS_COLLECTION,
                json!({ "visit_id": visit_id }),
                FindOptions::sorted(json!({ "is_primary": -1, "diagnosis_id": 1 })),
            )
            .await?;
        decode_all(rows)
    }

    pub async fn remove_diagnosis(&self, visit_id: i64, diagnosis_id: i64) -> Result<bool> {
        let deleted = self
            .client
            .delete_one(
                VISIT_DIAGNOSIS_COLLECTION,
                json!({ "visit_id": visit_id, "diagnosis_id": diagnosis_id }),
            )
            .await?;
        Ok(deleted > 0)
    }

    /// Without an explicit fee the procedure's default fee is charged.
    pub async fn add_procedure(
        &self,
        visit_id: i64,
        request: AddVisitProcedureRequest,
    ) -> Result<VisitProcedure> {
        let fee = match request.fee {
            Some(fee) => Some(fee),
            None => Repository::<Procedure>::with_client(self.client.clone())
                .get(request.procedure_id)
                .await?
                .and_then(|procedure| procedure.default_fee),
        };

        let link = VisitProcedure {
            visit_id,
            procedure_id: request.procedure_id,
            fee,
        };
        self.client
            .insert_one(VISIT_PROCEDURE_COLLECTION, serde_json::Value::Object(to_document(&link)?))
            .await?;
        Ok(link)
    }

    pub async fn procedures_for_visit(&self, visit_id: i64) -> Result<Vec<VisitProcedure>> {
        let rows = self
            .client
            .find(
                VISIT_PROCEDURE_COLLECTION,
                json!({ "visit_id": visit_id }),
                FindOptions::sorted(json!({ "procedure_id": 1 })),
            )
            .await?;
        decode_all(rows)
    }

    pub async fn remove_procedure(&self, visit_id: i64, procedure_id: i64) -> Result<bool> {
        let deleted = self
            .client
            .delete_one(
                VISIT_PROCEDURE_COLLECTION,
                json!({ "visit_id": visit_id, "procedure_id": procedure_id }),
            )
            .await?;
        Ok(deleted > 0)
    }

    pub async fn lab_tests_for_visit(&self, visit_id: i64) -> Result<Vec<LabTestOrder>> {
        Repository::<LabTestOrder>::with_client(self.client.clone())
            .find_sorted(json!({ "visit_id": visit_id }), json!({ "ordered_at": 1 }), None)
            .await
    }

    /// Lab tests ordered or resulted on `day`.
    pub async fn lab_tests_on(&self, day: NaiveDate) -> Result<Vec<LabTestOrder>> {
        debug!("Fetching lab tests for {}", day);
        let start = day.and_hms_opt(0, 0, 0).unwrap_or_default();
        let end = start + Duration::days(1);
        let filter = json!({
            "$or": [
                ejson::date_range_expr("ordered_at", start, end),
                ejson::date_range_expr("result_at", start, end)
            ]
        });
        Repository::<LabTestOrder>::with_client(self.client.clone())
            .find_sorted(filter, json!({ "ordered_at": 1 }), None)
            .await
    }

    pub async fn delivery_for_visit(&self, visit_id: i64) -> Result<Option<Delivery>> {
        Repository::<Delivery>::with_client(self.client.clone())
            .find_one(json!({ "visit_id": visit_id }))
            .await
    }

    /// Deliveries whose visit started on `day`.
    pub async fn deliveries_on(&self, day: NaiveDate) -> Result<Vec<DeliveryEntry>> {
        debug!("Fetching deliveries for {}", day);
        let start = day.and_hms_opt(0, 0, 0).unwrap_or_default();
        let pipeline = vec![
            json!({
                "$lookup": {
                    "from": Visit::COLLECTION,
                    "localField": "visit_id",
                    "foreignField": "visit_id",
                    "as": "visit"
                }
            }),
            json!({ "$unwind": "$visit" }),
            json!({ "$match": ejson::date_range_expr("visit.start_time", start, start + Duration::days(1)) }),
            json!({
                "$addFields": {
                    "patient_id": "$visit.patient_id",
                    "visit_start_time": "$visit.start_time"
                }
            }),
            json!({ "$project": { "visit": 0 } }),
            json!({ "$sort": { "visit_start_time": 1, "delivery_id": 1 } }),
        ];
        decode_all(self.client.aggregate(Delivery::COLLECTION, pipeline).await?)
    }
}
