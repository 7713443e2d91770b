use chrono::{Duration, Local, NaiveDate};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::{FindOptions, StoreClient};

use crate::definitions::{
    DAILY_CLINIC_SCHEDULE, PATIENT_CLINICAL_HISTORY, PATIENT_FINANCIAL_SUMMARY,
    STAFF_WORKLOAD_ANALYSIS, VISIT_COMPLETE_DETAILS, WALK_IN,
};
use crate::params::stamp;
use crate::queries::ViewQuery;

/// Read side of the materialized views.
pub struct ViewReader {
    client: StoreClient,
}

fn first_or_empty(rows: Vec<Value>) -> Value {
    rows.into_iter().next().unwrap_or_else(|| json!({}))
}

fn count(row: &Value, field: &str) -> i64 {
    row.get(field).and_then(Value::as_i64).unwrap_or(0)
}

fn amount(row: &Value, field: &str) -> f64 {
    row.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

fn flag_sum(field: &str) -> Value {
    json!({ "$sum": { "$cond": [format!("${}", field), 1, 0] } })
}

impl ViewReader {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: StoreClient::new(config),
        }
    }

    pub async fn find(&self, view: &str, query: &ViewQuery) -> anyhow::Result<Vec<Value>> {
        let options = FindOptions {
            projection: Some(json!({ "_id": 0 })),
            sort: query.sort.clone(),
            limit: query.limit,
            skip: None,
        };
        self.client
            .find(view, Value::Object(query.filter.clone()), options)
            .await
    }

    async fn group(&self, view: &str, stages: Vec<Value>) -> anyhow::Result<Value> {
        Ok(first_or_empty(self.client.aggregate(view, stages).await?))
    }

    /// Clinic-wide totals drawn from every view.
    pub async fn summary(&self, today: NaiveDate) -> anyhow::Result<Value> {
        let day_start = today.and_hms_opt(0, 0, 0).unwrap_or_default();

        let (visits, patients, staff, appointments, financials) = futures::try_join!(
            self.group(
                VISIT_COMPLETE_DETAILS,
                vec![json!({
                    "$group": {
                        "_id": null,
                        "total": { "$sum": 1 },
                        "active": { "$sum": { "$cond": [{ "$eq": ["$visit_status", "Active"] }, 1, 0] } }
                    }
                })],
            ),
            self.group(
                PATIENT_CLINICAL_HISTORY,
                vec![json!({
                    "$group": {
                        "_id": null,
                        "total": { "$sum": 1 },
                        "with_balance": flag_sum("has_outstanding_balance"),
                        "needing_follow_up": flag_sum("needs_follow_up")
                    }
                })],
            ),
            self.group(
                STAFF_WORKLOAD_ANALYSIS,
                vec![json!({
                    "$group": {
                        "_id": null,
                        "total": { "$sum": 1 },
                        "active": flag_sum("active"),
                        "busy": flag_sum("is_busy")
                    }
                })],
            ),
            self.group(
                DAILY_CLINIC_SCHEDULE,
                vec![
                    json!({
                        "$match": {
                            "scheduled_start": {
                                "$gte": stamp(day_start),
                                "$lt": stamp(day_start + Duration::days(1))
                            }
                        }
                    }),
                    json!({
                        "$group": {
                            "_id": null,
                            "total": { "$sum": 1 },
                            "walk_ins": { "$sum": { "$cond": [{ "$eq": ["$appointment_type", WALK_IN] }, 1, 0] } }
                        }
                    }),
                ],
            ),
            self.group(
                PATIENT_FINANCIAL_SUMMARY,
                vec![json!({
                    "$group": {
                        "_id": null,
                        "total_outstanding": { "$sum": "$outstanding_balance" },
                        "total_invoiced": { "$sum": "$total_invoiced" },
                        "total_paid": { "$sum": "$total_paid" }
                    }
                })],
            ),
        )?;

        let total_visits = count(&visits, "total");
        let active_visits = count(&visits, "active");
        let today_total = count(&appointments, "total");
        let walk_ins = count(&appointments, "walk_ins");

        Ok(json!({
            "visits": {
                "total": total_visits,
                "active": active_visits,
                "completed": total_visits - active_visits
            },
            "patients": {
                "total": count(&patients, "total"),
                "with_balance": count(&patients, "with_balance"),
                "needing_follow_up": count(&patients, "needing_follow_up")
            },
            "staff": {
                "total": count(&staff, "total"),
                "active": count(&staff, "active"),
                "busy": count(&staff, "busy")
            },
            "appointments": {
                "today": today_total,
                "walk_ins": walk_ins,
                "scheduled": today_total - walk_ins
            },
            "financials": {
                "total_outstanding": amount(&financials, "total_outstanding"),
                "total_invoiced": amount(&financials, "total_invoiced"),
                "total_paid": amount(&financials, "total_paid")
            },
            "timestamp": stamp(Local::now().naive_local())
        }))
    }
}
