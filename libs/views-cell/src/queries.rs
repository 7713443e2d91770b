//! Filters and summaries for the view endpoints.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::{json, Map, Value};

use shared_database::ejson::round2;
use shared_models::error::AppError;

use crate::definitions::{SCHEDULED, WALK_IN};
use crate::params::{self, Params};

/// A find against one view plus the echo of what was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewQuery {
    pub filter: Map<String, Value>,
    pub sort: Option<Value>,
    pub limit: Option<i64>,
    pub filters_applied: Value,
}

fn day_start(day: NaiveDate) -> NaiveDateTime {
    day.and_hms_opt(0, 0, 0).unwrap_or_default()
}

fn insert_flag(filter: &mut Map<String, Value>, field: &str, value: Option<bool>) {
    if let Some(value) = value {
        filter.insert(field.into(), json!(value));
    }
}

fn echo(params: &Params, name: &str) -> Value {
    params::raw(params, name).map_or(Value::Null, |value| json!(value))
}

pub fn visit_details(params: &Params) -> Result<ViewQuery, AppError> {
    let mut filter = Map::new();
    if let Some(status) = params::raw(params, "status") {
        filter.insert("visit_status".into(), json!(status));
    }
    if let Some(patient_id) = params::int(params, "patient_id")? {
        filter.insert("patient_id".into(), json!(patient_id));
    }
    if let Some(staff_id) = params::int(params, "staff_id")? {
        filter.insert("staff_id".into(), json!(staff_id));
    }

    let start = params::day(params, "start_date")?;
    let end = params::day(params, "end_date")?;
    if start.is_some() || end.is_some() {
        let mut range = Map::new();
        if let Some(start) = start {
            range.insert("$gte".into(), params::stamp(day_start(start)));
        }
        if let Some(end) = end {
            // end_date covers the whole day
            range.insert("$lt".into(), params::stamp(day_start(end) + Duration::days(1)));
        }
        filter.insert("start_time".into(), Value::Object(range));
    }

    let limit = params::limit(params);
    Ok(ViewQuery {
        filter,
        sort: Some(json!({ "start_time": -1, "visit_id": -1 })),
        limit: Some(limit),
        filters_applied: json!({
            "status": echo(params, "status"),
            "patient_id": echo(params, "patient_id"),
            "staff_id": echo(params, "staff_id"),
            "start_date": echo(params, "start_date"),
            "end_date": echo(params, "end_date"),
            "limit": limit
        }),
    })
}

pub const FINANCIAL_SORT_FIELDS: [&str; 5] = [
    "outstanding_balance",
    "total_invoiced",
    "total_paid",
    "patient_id",
    "full_name",
];

pub fn patient_financials(params: &Params) -> Result<ViewQuery, AppError> {
    let mut filter = Map::new();
    if let Some(patient_id) = params::int(params, "patient_id")? {
        filter.insert("patient_id".into(), json!(patient_id));
    }
    insert_flag(&mut filter, "has_outstanding_balance", params::flag(params, "has_balance"));
    if let Some(min_balance) = params::number(params, "min_balance")? {
        filter.insert("outstanding_balance".into(), json!({ "$gte": min_balance }));
    }

    let (sort_by, direction) = params::sort(params, &FINANCIAL_SORT_FIELDS, "outstanding_balance");
    let limit = params::limit(params);
    Ok(ViewQuery {
        filter,
        sort: Some(json!({ sort_by.as_str(): direction })),
        limit: Some(limit),
        filters_applied: json!({
            "patient_id": echo(params, "patient_id"),
            "has_balance": echo(params, "has_balance"),
            "min_balance": echo(params, "min_balance"),
            "sort_by": sort_by,
            "sort_order": if direction == 1 { "asc" } else { "desc" },
            "limit": limit
        }),
    })
}

pub const WORKLOAD_SORT_FIELDS: [&str; 5] = [
    "workload_score",
    "total_visits",
    "total_appointments",
    "active_visits",
    "staff_id",
];

pub fn staff_workload(params: &Params) -> Result<ViewQuery, AppError> {
    let mut filter = Map::new();
    if let Some(staff_id) = params::int(params, "staff_id")? {
        filter.insert("staff_id".into(), json!(staff_id));
    }
    let active_only = params::flag(params, "active_only").unwrap_or(true);
    if active_only {
        filter.insert("active".into(), json!(true));
    }
    insert_flag(&mut filter, "is_busy", params::flag(params, "is_busy"));
    if let Some(min_workload) = params::number(params, "min_workload")? {
        filter.insert("workload_score".into(), json!({ "$gte": min_workload }));
    }

    let (sort_by, direction) = params::sort(params, &WORKLOAD_SORT_FIELDS, "workload_score");
    Ok(ViewQuery {
        filter,
        sort: Some(json!({ sort_by.as_str(): direction })),
        limit: None,
        filters_applied: json!({
            "staff_id": echo(params, "staff_id"),
            "active_only": active_only,
            "is_busy": echo(params, "is_busy"),
            "min_workload": echo(params, "min_workload"),
            "sort_by": sort_by
        }),
    })
}

/// Appointments for one day (`today` unless `date` is given). Explicit
/// `start_time`/`end_time` replace the day window.
pub fn clinic_schedule(params: &Params, today: NaiveDate) -> Result<(ViewQuery, NaiveDate), AppError> {
    let day = params::day(params, "date")?.unwrap_or(today);
    let mut filter = Map::new();
    filter.insert(
        "scheduled_start".into(),
        json!({
            "$gte": params::stamp(day_start(day)),
            "$lt": params::stamp(day_start(day) + Duration::days(1))
        }),
    );
    if let Some(staff_id) = params::int(params, "staff_id")? {
        filter.insert("staff_id".into(), json!(staff_id));
    }
    if let Some(patient_id) = params::int(params, "patient_id")? {
        filter.insert("patient_id".into(), json!(patient_id));
    }
    if let Some(kind) = params::raw(params, "appointment_type") {
        filter.insert("appointment_type".into(), json!(kind));
    }

    let start = params::instant(params, "start_time")?;
    let end = params::instant(params, "end_time")?;
    if start.is_some() || end.is_some() {
        let mut range = Map::new();
        if let Some(start) = start {
            range.insert("$gte".into(), params::stamp(start));
        }
        if let Some(end) = end {
            range.insert("$lt".into(), params::stamp(end));
        }
        filter.insert("scheduled_start".into(), Value::Object(range));
    }

    let query = ViewQuery {
        filter,
        sort: Some(json!({ "scheduled_start": 1 })),
        limit: None,
        filters_applied: json!({
            "date": params::raw(params, "date").unwrap_or("today"),
            "staff_id": echo(params, "staff_id"),
            "patient_id": echo(params, "patient_id"),
            "appointment_type": echo(params, "appointment_type")
        }),
    };
    Ok((query, day))
}

pub const HISTORY_SORT_FIELDS: [&str; 5] = [
    "last_visit_date",
    "total_visits",
    "outstanding_balance",
    "patient_id",
    "full_name",
];

pub fn patient_history(params: &Params) -> Result<ViewQuery, AppError> {
    let mut filter = Map::new();
    if let Some(patient_id) = params::int(params, "patient_id")? {
        filter.insert("patient_id".into(), json!(patient_id));
    }
    insert_flag(&mut filter, "has_active_visit", params::flag(params, "has_active_visit"));
    insert_flag(&mut filter, "needs_follow_up", params::flag(params, "needs_follow_up"));
    if let Some(min_visits) = params::int(params, "min_visits")? {
        filter.insert("total_visits".into(), json!({ "$gte": min_visits }));
    }
    insert_flag(&mut filter, "has_outstanding_balance", params::flag(params, "has_balance"));

    let (sort_by, direction) = params::sort(params, &HISTORY_SORT_FIELDS, "last_visit_date");
    let limit = params::limit(params);
    Ok(ViewQuery {
        filter,
        sort: Some(json!({ sort_by.as_str(): direction })),
        limit: Some(limit),
        filters_applied: json!({
            "patient_id": echo(params, "patient_id"),
            "has_active_visit": echo(params, "has_active_visit"),
            "needs_follow_up": echo(params, "needs_follow_up"),
            "min_visits": echo(params, "min_visits"),
            "has_balance": echo(params, "has_balance"),
            "sort_by": sort_by
        }),
    })
}

// ==============================================================================
// SUMMARIES
// ==============================================================================

fn number(row: &Value, field: &str) -> f64 {
    row.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

fn is_true(row: &Value, field: &str) -> bool {
    row.get(field).and_then(Value::as_bool).unwrap_or(false)
}

fn count_where(rows: &[Value], predicate: impl Fn(&Value) -> bool) -> usize {
    rows.iter().filter(|row| predicate(row)).count()
}

fn distinct_ids(rows: &[Value], field: &str) -> usize {
    let mut ids: Vec<i64> = rows
        .iter()
        .filter_map(|row| row.get(field).and_then(Value::as_i64))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}

pub fn financial_summary(rows: &[Value]) -> Value {
    json!({
        "total_outstanding": round2(rows.iter().map(|r| number(r, "outstanding_balance")).sum()),
        "total_invoiced": round2(rows.iter().map(|r| number(r, "total_invoiced")).sum()),
        "total_paid": round2(rows.iter().map(|r| number(r, "total_paid")).sum()),
        "patients_with_balance": count_where(rows, |r| is_true(r, "has_outstanding_balance"))
    })
}

pub fn workload_summary(rows: &[Value]) -> Value {
    let total_score: f64 = rows.iter().map(|r| number(r, "workload_score")).sum();
    let average = if rows.is_empty() {
        0.0
    } else {
        round2(total_score / rows.len() as f64)
    };
    json!({
        "total_staff": rows.len(),
        "busy_staff": count_where(rows, |r| is_true(r, "is_busy")),
        "total_active_visits": rows.iter().map(|r| number(r, "active_visits")).sum::<f64>() as i64,
        "total_appointments": rows.iter().map(|r| number(r, "total_appointments")).sum::<f64>() as i64,
        "avg_workload_score": average
    })
}

pub fn schedule_summary(rows: &[Value]) -> Value {
    let of_type = |kind: &'static str| {
        count_where(rows, move |r| r.get("appointment_type").and_then(Value::as_str) == Some(kind))
    };
    json!({
        "total_appointments": rows.len(),
        "walk_ins": of_type(WALK_IN),
        "scheduled": of_type(SCHEDULED),
        "unique_patients": distinct_ids(rows, "patient_id"),
        "unique_staff": distinct_ids(rows, "staff_id")
    })
}

pub fn history_summary(rows: &[Value]) -> Value {
    json!({
        "total_patients": rows.len(),
        "with_active_visits": count_where(rows, |r| is_true(r, "has_active_visit")),
        "needing_follow_up": count_where(rows, |r| is_true(r, "needs_follow_up")),
        "with_outstanding_balance": count_where(rows, |r| is_true(r, "has_outstanding_balance")),
        "total_visits": rows.iter().map(|r| number(r, "total_visits")).sum::<f64>() as i64,
        "total_outstanding": round2(rows.iter().map(|r| number(r, "outstanding_balance")).sum())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn end_date_is_inclusive() {
        let query = visit_details(&params(&[("start_date", "2025-11-01"), ("end_date", "2025-11-30")])).unwrap();
        assert_eq!(
            query.filter["start_time"],
            json!({ "$gte": "2025-11-01T00:00:00", "$lt": "2025-12-01T00:00:00" })
        );
        assert_eq!(query.limit, Some(100));
    }

    #[test]
    fn bad_patient_id_is_rejected() {
        assert!(visit_details(&params(&[("patient_id", "forty")])).is_err());
        assert!(patient_history(&params(&[("min_visits", "many")])).is_err());
    }

    #[test]
    fn financials_default_to_largest_balance_first() {
        let query = patient_financials(&params(&[("has_balance", "true"), ("min_balance", "100")])).unwrap();
        assert_eq!(query.sort, Some(json!({ "outstanding_balance": -1 })));
        assert_eq!(query.filter["has_outstanding_balance"], json!(true));
        assert_eq!(query.filter["outstanding_balance"], json!({ "$gte": 100.0 }));
    }

    #[test]
    fn workload_filters_active_staff_unless_told_otherwise() {
        let default = staff_workload(&params(&[])).unwrap();
        assert_eq!(default.filter.get("active"), Some(&json!(true)));

        let everyone = staff_workload(&params(&[("active_only", "false")])).unwrap();
        assert!(everyone.filter.get("active").is_none());
    }

    #[test]
    fn explicit_times_override_the_day() {
        let today = NaiveDate::from_ymd_opt(2025, 11, 25).unwrap();
        let (query, day) = clinic_schedule(
            &params(&[("start_time", "2025-11-25T09:00:00"), ("end_time", "2025-11-25T17:00:00")]),
            today,
        )
        .unwrap();
        assert_eq!(day, today);
        assert_eq!(
            query.filter["scheduled_start"],
            json!({ "$gte": "2025-11-25T09:00:00", "$lt": "2025-11-25T17:00:00" })
        );
        assert_eq!(query.filters_applied["date"], "today");
    }

    #[test]
    fn schedule_summary_counts_types_and_people() {
        let rows = vec![
            json!({ "appointment_type": "Walk-in", "patient_id": 1, "staff_id": 2 }),
            json!({ "appointment_type": "Scheduled", "patient_id": 1, "staff_id": 3 }),
            json!({ "appointment_type": "Scheduled", "patient_id": 4, "staff_id": 3 }),
        ];
        assert_eq!(
            schedule_summary(&rows),
            json!({
                "total_appointments": 3,
                "walk_ins": 1,
                "scheduled": 2,
                "unique_patients": 2,
                "unique_staff": 2
            })
        );
    }

    #[test]
    fn workload_average_handles_empty_view() {
        assert_eq!(workload_summary(&[])["avg_workload_score"], json!(0.0));
        let rows = vec![json!({ "workload_score": 3 }), json!({ "workload_score": 4, "is_busy": true })];
        let summary = workload_summary(&rows);
        assert_eq!(summary["avg_workload_score"], json!(3.5));
        assert_eq!(summary["busy_staff"], json!(1));
    }
}
