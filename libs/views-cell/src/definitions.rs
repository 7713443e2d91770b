//! Pipelines behind the materialized views.
//!
//! Every pipeline runs over its base collection and yields the rows stored
//! in the view collection. Timestamps are coerced to dates on the way so
//! they come back in one normalized format regardless of how the source
//! documents stored them.

use chrono::{Duration, NaiveDateTime};
use serde_json::{json, Value};

use shared_database::ejson;

pub const VISIT_COMPLETE_DETAILS: &str = "visit_complete_details";
pub const PATIENT_FINANCIAL_SUMMARY: &str = "patient_financial_summary";
pub const STAFF_WORKLOAD_ANALYSIS: &str = "staff_workload_analysis";
pub const DAILY_CLINIC_SCHEDULE: &str = "daily_clinic_schedule";
pub const PATIENT_CLINICAL_HISTORY: &str = "patient_clinical_history";

/// Collection holding `{view, document_count, refreshed_at}` per view.
pub const VIEW_META: &str = "view_meta";

pub const WALK_IN: &str = "Walk-in";
pub const SCHEDULED: &str = "Scheduled";
const WALK_IN_COLOR: &str = "#ea4335";
const SCHEDULED_COLOR: &str = "#4285f4";

/// Days since the last visit after which a patient with no open visit is
/// flagged for follow-up.
pub const FOLLOW_UP_AFTER_DAYS: i64 = 180;

#[derive(Debug, Clone, Copy)]
pub struct ViewDefinition {
    pub name: &'static str,
    pub base: &'static str,
    build: fn(NaiveDateTime) -> Vec<Value>,
}

impl ViewDefinition {
    /// Pipeline as of `now`; some fields depend on the current time.
    pub fn pipeline(&self, now: NaiveDateTime) -> Vec<Value> {
        (self.build)(now)
    }
}

pub static VIEWS: [ViewDefinition; 5] = [
    ViewDefinition {
        name: VISIT_COMPLETE_DETAILS,
        base: "Visit",
        build: visit_complete_details,
    },
    ViewDefinition {
        name: PATIENT_FINANCIAL_SUMMARY,
        base: "Patient",
        build: patient_financial_summary,
    },
    ViewDefinition {
        name: STAFF_WORKLOAD_ANALYSIS,
        base: "Staff",
        build: staff_workload_analysis,
    },
    ViewDefinition {
        name: DAILY_CLINIC_SCHEDULE,
        base: "Appointment",
        build: daily_clinic_schedule,
    },
    ViewDefinition {
        name: PATIENT_CLINICAL_HISTORY,
        base: "Patient",
        build: patient_clinical_history,
    },
];

pub fn find(name: &str) -> Option<&'static ViewDefinition> {
    VIEWS.iter().find(|view| view.name == name)
}

fn lookup(from: &str, local: &str, foreign: &str, alias: &str) -> Value {
    json!({
        "$lookup": {
            "from": from,
            "localField": local,
            "foreignField": foreign,
            "as": alias
        }
    })
}

fn unwind_optional(path: &str) -> Value {
    json!({ "$unwind": { "path": format!("${}", path), "preserveNullAndEmptyArrays": true } })
}

fn full_name(prefix: &str) -> Value {
    json!({
        "$trim": {
            "input": {
                "$concat": [
                    { "$ifNull": [format!("${}.first_name", prefix), ""] },
                    " ",
                    { "$ifNull": [format!("${}.last_name", prefix), ""] }
                ]
            }
        }
    })
}

fn is_open(field: &str) -> Value {
    json!({ "$eq": [{ "$ifNull": [field, null] }, null] })
}

fn size(field: &str) -> Value {
    json!({ "$size": { "$ifNull": [field, []] } })
}

fn minutes_between(start: &str, end: &str) -> Value {
    json!({
        "$cond": [
            { "$and": [ejson::to_date(start), ejson::to_date(end)] },
            {
                "$dateDiff": {
                    "startDate": ejson::to_date(start),
                    "endDate": ejson::to_date(end),
                    "unit": "minute"
                }
            },
            null
        ]
    })
}

/// Invoices that still count toward a balance.
fn billable_invoices(alias: &str) -> Value {
    json!({
        "$lookup": {
            "from": "Invoice",
            "let": { "pid": "$patient_id" },
            "pipeline": [
                {
                    "$match": {
                        "$expr": {
                            "$and": [
                                { "$eq": ["$patient_id", "$$pid"] },
                                { "$ne": ["$status", "void"] }
                            ]
                        }
                    }
                }
            ],
            "as": alias
        }
    })
}

fn outstanding(invoices: &str, payments: &str) -> Value {
    json!({
        "$round": [
            {
                "$subtract": [
                    { "$sum": format!("${}.patient_portion", invoices) },
                    { "$sum": format!("${}.amount", payments) }
                ]
            },
            2
        ]
    })
}

fn visit_complete_details(_now: NaiveDateTime) -> Vec<Value> {
    vec![
        lookup("Patient", "patient_id", "patient_id", "patient"),
        unwind_optional("patient"),
        lookup("Staff", "staff_id", "staff_id", "staff"),
        unwind_optional("staff"),
        lookup("Prescription", "visit_id", "visit_id", "prescriptions"),
        lookup("LabTestOrder", "visit_id", "visit_id", "lab_tests"),
        lookup("VisitDiagnosis", "visit_id", "visit_id", "diagnoses"),
        json!({
            "$project": {
                "_id": 0,
                "visit_id": 1,
                "patient_id": 1,
                "staff_id": 1,
                "appointment_id": 1,
                "visit_type": 1,
                "notes": 1,
                "start_time": ejson::to_date("start_time"),
                "end_time": ejson::to_date("end_time"),
                "patient_name": full_name("patient"),
                "staff_name": full_name("staff"),
                "staff_role": "$staff.role",
                "visit_status": { "$cond": [is_open("$end_time"), "Active", "Completed"] },
                "duration_minutes": minutes_between("start_time", "end_time"),
                "prescription_count": size("$prescriptions"),
                "lab_test_count": size("$lab_tests"),
                "diagnosis_count": size("$diagnoses")
            }
        }),
        json!({ "$sort": { "visit_id": 1 } }),
    ]
}

fn patient_financial_summary(_now: NaiveDateTime) -> Vec<Value> {
    vec![
        billable_invoices("invoices"),
        lookup("Payment", "patient_id", "patient_id", "payments"),
        json!({
            "$addFields": {
                "outstanding_balance": outstanding("invoices", "payments")
            }
        }),
        json!({
            "$project": {
                "_id": 0,
                "patient_id": 1,
                "full_name": full_name("$ROOT"),
                "email": 1,
                "phone": 1,
                "insurance_no": 1,
                "invoice_count": size("$invoices"),
                "payment_count": size("$payments"),
                "total_invoiced": { "$round": [{ "$sum": "$invoices.patient_portion" }, 2] },
                "total_paid": { "$round": [{ "$sum": "$payments.amount" }, 2] },
                "outstanding_balance": 1,
                "has_outstanding_balance": { "$gt": ["$outstanding_balance", 0] },
                "last_payment_date": {
                    "$max": {
                        "$map": { "input": "$payments", "as": "p", "in": ejson::to_date("$p.payment_date") }
                    }
                }
            }
        }),
        json!({ "$sort": { "patient_id": 1 } }),
    ]
}

fn staff_workload_analysis(now: NaiveDateTime) -> Vec<Value> {
    vec![
        lookup("Appointment", "staff_id", "staff_id", "appointments"),
        lookup("Visit", "staff_id", "staff_id", "visits"),
        json!({
            "$addFields": {
                "total_appointments": size("$appointments"),
                "upcoming_appointments": {
                    "$size": {
                        "$filter": {
                            "input": "$appointments",
                            "as": "a",
                            "cond": {
                                "$and": [
                                    { "$gte": [ejson::to_date("$a.scheduled_start"), ejson::date(now)] },
                                    { "$ne": ["$$a.status", "cancelled"] }
                                ]
                            }
                        }
                    }
                },
                "total_visits": size("$visits"),
                "active_visits": {
                    "$size": {
                        "$filter": { "input": "$visits", "as": "v", "cond": is_open("$$v.end_time") }
                    }
                }
            }
        }),
        json!({
            "$project": {
                "_id": 0,
                "staff_id": 1,
                "full_name": full_name("$ROOT"),
                "role": 1,
                "active": { "$ifNull": ["$active", true] },
                "total_appointments": 1,
                "upcoming_appointments": 1,
                "total_visits": 1,
                "active_visits": 1,
                "completed_visits": { "$subtract": ["$total_visits", "$active_visits"] },
                "workload_score": {
                    "$add": [
                        "$total_appointments",
                        "$total_visits",
                        { "$multiply": ["$active_visits", 2] }
                    ]
                },
                "is_busy": { "$gt": ["$active_visits", 0] }
            }
        }),
        json!({ "$sort": { "staff_id": 1 } }),
    ]
}

fn daily_clinic_schedule(_now: NaiveDateTime) -> Vec<Value> {
    let walk_in = json!({ "$eq": ["$is_walkin", true] });
    vec![
        lookup("Patient", "patient_id", "patient_id", "patient"),
        unwind_optional("patient"),
        lookup("Staff", "staff_id", "staff_id", "staff"),
        unwind_optional("staff"),
        json!({
            "$project": {
                "_id": 0,
                "appointment_id": 1,
                "patient_id": 1,
                "staff_id": 1,
                "status": 1,
                "reason": 1,
                "is_walkin": { "$ifNull": ["$is_walkin", false] },
                "scheduled_start": ejson::to_date("scheduled_start"),
                "scheduled_end": ejson::to_date("scheduled_end"),
                "patient_name": full_name("patient"),
                "patient_phone": "$patient.phone",
                "staff_name": full_name("staff"),
                "staff_role": "$staff.role",
                "appointment_type": { "$cond": [walk_in.clone(), WALK_IN, SCHEDULED] },
                "color": { "$cond": [walk_in, WALK_IN_COLOR, SCHEDULED_COLOR] },
                "duration_minutes": minutes_between("scheduled_start", "scheduled_end")
            }
        }),
        json!({ "$sort": { "scheduled_start": 1, "appointment_id": 1 } }),
    ]
}

fn patient_clinical_history(now: NaiveDateTime) -> Vec<Value> {
    let follow_up_cutoff = now - Duration::days(FOLLOW_UP_AFTER_DAYS);
    vec![
        lookup("Visit", "patient_id", "patient_id", "visits"),
        billable_invoices("invoices"),
        lookup("Payment", "patient_id", "patient_id", "payments"),
        json!({
            "$addFields": {
                "total_visits": size("$visits"),
                "active_visits": {
                    "$size": {
                        "$filter": { "input": "$visits", "as": "v", "cond": is_open("$$v.end_time") }
                    }
                },
                "last_visit_date": {
                    "$max": {
                        "$map": { "input": "$visits", "as": "v", "in": ejson::to_date("$v.start_time") }
                    }
                },
                "outstanding_balance": outstanding("invoices", "payments")
            }
        }),
        json!({
            "$project": {
                "_id": 0,
                "patient_id": 1,
                "full_name": full_name("$ROOT"),
                "date_of_birth": 1,
                "phone": 1,
                "total_visits": 1,
                "active_visits": 1,
                "has_active_visit": { "$gt": ["$active_visits", 0] },
                "last_visit_date": 1,
                "outstanding_balance": 1,
                "has_outstanding_balance": { "$gt": ["$outstanding_balance", 0] },
                "needs_follow_up": {
                    "$and": [
                        { "$gt": ["$total_visits", 0] },
                        { "$eq": ["$active_visits", 0] },
                        { "$lt": ["$last_visit_date", ejson::date(follow_up_cutoff)] }
                    ]
                }
            }
        }),
        json!({ "$sort": { "patient_id": 1 } }),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn project_stage(pipeline: &[Value]) -> &Value {
        pipeline
            .iter()
            .find_map(|stage| stage.get("$project"))
            .expect("pipeline has a $project stage")
    }

    #[test]
    fn view_names_are_unique() {
        for (i, view) in VIEWS.iter().enumerate() {
            assert!(VIEWS[i + 1..].iter().all(|other| other.name != view.name));
        }
        assert_eq!(find(DAILY_CLINIC_SCHEDULE).map(|v| v.base), Some("Appointment"));
        assert!(find("nope").is_none());
    }

    #[test]
    fn workload_weights_active_visits_twice() {
        let pipeline = find(STAFF_WORKLOAD_ANALYSIS).unwrap().pipeline(now());
        let score = &project_stage(&pipeline)["workload_score"]["$add"];
        assert_eq!(score[2], json!({ "$multiply": ["$active_visits", 2] }));
    }

    #[test]
    fn follow_up_cutoff_is_180_days_back() {
        let pipeline = find(PATIENT_CLINICAL_HISTORY).unwrap().pipeline(now());
        let conditions = &project_stage(&pipeline)["needs_follow_up"]["$and"];
        assert_eq!(
            conditions[2]["$lt"][1],
            json!({ "$date": "2024-01-03T12:00:00.000Z" })
        );
    }

    #[test]
    fn schedule_colors_walk_ins() {
        let pipeline = find(DAILY_CLINIC_SCHEDULE).unwrap().pipeline(now());
        let color = &project_stage(&pipeline)["color"]["$cond"];
        assert_eq!(color[1], WALK_IN_COLOR);
        assert_eq!(color[2], SCHEDULED_COLOR);
    }

    #[test]
    fn every_view_strips_object_ids() {
        for view in VIEWS.iter() {
            assert_eq!(project_stage(&view.pipeline(now()))["_id"], 0, "{}", view.name);
        }
    }
}
