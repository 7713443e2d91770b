//! Lenient query-string parsing shared by the view endpoints.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use shared_models::{
    dates::{parse_date, parse_datetime},
    error::AppError,
    query::{DEFAULT_LIMIT, MAX_LIMIT},
};

pub type Params = HashMap<String, String>;

/// Views store timestamps in this form, so string ranges compare correctly.
pub const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn stamp(at: NaiveDateTime) -> Value {
    Value::String(at.format(STAMP_FORMAT).to_string())
}

pub fn raw<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

pub fn int(params: &Params, name: &str) -> Result<Option<i64>, AppError> {
    raw(params, name)
        .map(|value| {
            value
                .parse::<i64>()
                .map_err(|_| AppError::BadRequest(format!("Invalid {}", name)))
        })
        .transpose()
}

pub fn number(params: &Params, name: &str) -> Result<Option<f64>, AppError> {
    raw(params, name)
        .map(|value| {
            value
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| AppError::BadRequest(format!("Invalid {}", name)))
        })
        .transpose()
}

/// `true`/`false` in any case; anything else is ignored.
pub fn flag(params: &Params, name: &str) -> Option<bool> {
    match raw(params, name)?.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn limit(params: &Params) -> i64 {
    raw(params, "limit")
        .and_then(|value| value.parse::<i64>().ok())
        .map(|value| value.min(MAX_LIMIT))
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_LIMIT)
}

/// `sort_by` restricted to `allowed` (falling back to `default`) and the
/// matching direction: ascending only for `sort_order=asc`.
pub fn sort(params: &Params, allowed: &[&str], default: &str) -> (String, i32) {
    let field = raw(params, "sort_by")
        .filter(|field| allowed.contains(field))
        .unwrap_or(default);
    let direction = match raw(params, "sort_order") {
        Some(order) if order.eq_ignore_ascii_case("asc") => 1,
        _ => -1,
    };
    (field.to_string(), direction)
}

pub fn day(params: &Params, name: &str) -> Result<Option<NaiveDate>, AppError> {
    raw(params, name)
        .map(|value| {
            parse_date(value).ok_or_else(|| {
                AppError::BadRequest(format!("Invalid {} format. Use ISO format (YYYY-MM-DD)", name))
            })
        })
        .transpose()
}

pub fn instant(params: &Params, name: &str) -> Result<Option<NaiveDateTime>, AppError> {
    raw(params, name)
        .map(|value| {
            parse_datetime(value).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Invalid {} format. Use ISO format (YYYY-MM-DDTHH:MM:SS)",
                    name
                ))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn bad_ids_name_the_parameter() {
        let err = int(&params(&[("patient_id", "abc")]), "patient_id").unwrap_err();
        assert_matches!(err, AppError::BadRequest(message) if message == "Invalid patient_id");
        assert_eq!(int(&params(&[("patient_id", " 42 ")]), "patient_id").unwrap(), Some(42));
        assert_eq!(int(&params(&[("patient_id", "")]), "patient_id").unwrap(), None);
    }

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(limit(&params(&[])), 100);
        assert_eq!(limit(&params(&[("limit", "lots")])), 100);
        assert_eq!(limit(&params(&[("limit", "5000")])), 1000);
        assert_eq!(limit(&params(&[("limit", "25")])), 25);
    }

    #[test]
    fn flags_are_case_insensitive() {
        assert_eq!(flag(&params(&[("has_balance", "TRUE")]), "has_balance"), Some(true));
        assert_eq!(flag(&params(&[("has_balance", "False")]), "has_balance"), Some(false));
        assert_eq!(flag(&params(&[("has_balance", "yes")]), "has_balance"), None);
    }

    #[test]
    fn unknown_sort_field_falls_back() {
        let allowed = ["total_paid", "patient_id"];
        assert_eq!(
            sort(&params(&[("sort_by", "ssn")]), &allowed, "patient_id"),
            ("patient_id".to_string(), -1)
        );
        assert_eq!(
            sort(&params(&[("sort_by", "total_paid"), ("sort_order", "ASC")]), &allowed, "patient_id"),
            ("total_paid".to_string(), 1)
        );
    }

    #[test]
    fn dates_report_expected_format() {
        let err = day(&params(&[("start_date", "11/01/2025")]), "start_date").unwrap_err();
        assert_matches!(err, AppError::BadRequest(message) if message.contains("YYYY-MM-DD"));
        assert_eq!(
            day(&params(&[("start_date", "2025-11-01")]), "start_date").unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 1)
        );
    }
}
