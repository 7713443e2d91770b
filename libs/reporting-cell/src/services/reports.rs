use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{ejson, repository::decode_all, StoreClient};

use crate::models::{
    ActivityMetrics, DeliveryLogEntry, MonthWindow, MonthlyActivity, OutstandingBalance,
};

const VISIT: &str = "Visit";

fn full_name(prefix: &str) -> Value {
    json!({
        "$concat": [
            { "$ifNull": [format!("${}.first_name", prefix), ""] },
            " ",
            { "$ifNull": [format!("${}.last_name", prefix), ""] }
        ]
    })
}

pub struct ReportService {
    client: StoreClient,
}

impl ReportService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: StoreClient::new(config),
        }
    }

    /// Invoices not marked paid that still have money owing.
    pub async fn outstanding_balances(&self) -> anyhow::Result<Vec<OutstandingBalance>> {
        let pipeline = vec![
            json!({ "$match": { "status": { "$ne": "paid" } } }),
            json!({
                "$lookup": {
                    "from": "Patient",
                    "localField": "patient_id",
                    "foreignField": "patient_id",
                    "as": "patient"
                }
            }),
            json!({ "$unwind": "$patient" }),
            json!({
                "$lookup": {
                    "from": "Payment",
                    "localField": "invoice_id",
                    "foreignField": "invoice_id",
                    "as": "payments"
                }
            }),
            json!({
                "$project": {
                    "_id": 0,
                    "patient_name": full_name("patient"),
                    "patient_id": 1,
                    "invoice_id": 1,
                    "total_amount": 1,
                    "patient_portion": 1,
                    "total_paid": { "$sum": "$payments.amount" },
                    "balance_due": {
                        "$subtract": ["$patient_portion", { "$sum": "$payments.amount" }]
                    }
                }
            }),
            json!({ "$match": { "balance_due": { "$gt": 0 } } }),
            json!({ "$sort": { "invoice_id": 1 } }),
        ];
        decode_all(self.client.aggregate("Invoice", pipeline).await?)
    }

    /// Visit volume for the month. Deliveries, lab tests and prescriptions
    /// are counted through the month's visits.
    pub async fn monthly_activity(&self, window: &MonthWindow) -> anyhow::Result<MonthlyActivity> {
        let pipeline = vec![
            json!({ "$match": ejson::date_range_expr("start_time", window.start, window.end) }),
            json!({
                "$group": {
                    "_id": null,
                    "total_visits": { "$sum": 1 },
                    "avg_duration_minutes": {
                        "$avg": {
                            "$dateDiff": {
                                "startDate": ejson::to_date("start_time"),
                                "endDate": ejson::to_date("end_time"),
                                "unit": "minute"
                            }
                        }
                    },
                    "visit_ids": { "$push": "$visit_id" }
                }
            }),
        ];
        let stats = self
            .client
            .aggregate(VISIT, pipeline)
            .await?
            .into_iter()
            .next()
            .unwrap_or_else(|| json!({}));

        let total_visits = stats["total_visits"].as_u64().unwrap_or(0);
        let average = stats["avg_duration_minutes"].as_f64().unwrap_or(0.0);
        let visit_ids = stats["visit_ids"].as_array().cloned().unwrap_or_default();
        debug!("{} visits in {}", total_visits, window.label());

        let (total_deliveries, total_lab_tests, total_prescriptions) = if visit_ids.is_empty() {
            (0, 0, 0)
        } else {
            let filter = json!({ "visit_id": { "$in": visit_ids } });
            futures::try_join!(
                self.client.count("Delivery", filter.clone()),
                self.client.count("LabTestOrder", filter.clone()),
                self.client.count("Prescription", filter),
            )?
        };

        Ok(MonthlyActivity {
            report_month: window.label(),
            metrics: ActivityMetrics {
                total_patient_visits: total_visits,
                average_visit_duration_mins: ejson::round2(average),
                total_deliveries,
                total_lab_tests,
                total_prescriptions,
            },
        })
    }

    /// Deliveries performed during visits that started on `day`.
    pub async fn daily_delivery_log(&self, day: NaiveDate) -> anyhow::Result<Vec<DeliveryLogEntry>> {
        let start = day.and_hms_opt(0, 0, 0).unwrap_or_default();
        let pipeline = vec![
            json!({ "$match": ejson::date_range_expr("start_time", start, start + Duration::days(1)) }),
            json!({
                "$lookup": {
                    "from": "Delivery",
                    "localField": "visit_id",
                    "foreignField": "visit_id",
                    "as": "delivery"
                }
            }),
            json!({ "$unwind": "$delivery" }),
            json!({
                "$lookup": {
                    "from": "Patient",
                    "localField": "patient_id",
                    "foreignField": "patient_id",
                    "as": "patient"
                }
            }),
            json!({ "$unwind": "$patient" }),
            json!({
                "$lookup": {
                    "from": "Staff",
                    "localField": "delivery.performed_by",
                    "foreignField": "staff_id",
                    "as": "staff"
                }
            }),
            json!({ "$unwind": "$staff" }),
            json!({ "$sort": { "start_time": 1 } }),
            json!({
                "$project": {
                    "_id": 0,
                    "time": "$start_time",
                    "patient": full_name("patient"),
                    "performed_by": full_name("staff"),
                    "visit_type": 1
                }
            }),
        ];
        decode_all(self.client.aggregate(VISIT, pipeline).await?)
    }
}
