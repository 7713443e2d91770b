//! Extended JSON conversions between the store's wire format and plain JSON.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use serde_json::{json, Map, Value};

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Date literal for filters and pipelines.
pub fn date(at: NaiveDateTime) -> Value {
    json!({ "$date": at.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true) })
}

pub fn day_start(day: NaiveDate) -> Value {
    date(day.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Coerce a document field into a date inside an aggregation expression.
/// Strings and native dates both convert; anything else becomes null.
pub fn to_date(field: &str) -> Value {
    json!({
        "$convert": {
            "input": format!("${}", field),
            "to": "date",
            "onError": null,
            "onNull": null
        }
    })
}

/// `$expr` matching documents whose `field` falls inside `[start, end)`.
pub fn date_range_expr(field: &str, start: NaiveDateTime, end: NaiveDateTime) -> Value {
    json!({
        "$expr": {
            "$and": [
                { "$gte": [to_date(field), date(start)] },
                { "$lt": [to_date(field), date(end)] }
            ]
        }
    })
}

/// `$expr` matching documents whose `[start_field, end_field)` interval
/// overlaps `[start, end)`. Documents missing either bound never match.
pub fn overlap_expr(
    start_field: &str,
    end_field: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Value {
    json!({
        "$expr": {
            "$and": [
                { "$lt": [to_date(start_field), date(end)] },
                { "$gt": [to_date(end_field), date(start)] }
            ]
        }
    })
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Strip Extended JSON wrappers and `_id` keys so documents can be returned
/// to clients or deserialized into plain structs.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(map) => sanitize_object(map),
        other => other,
    }
}

fn sanitize_object(mut map: Map<String, Value>) -> Value {
    if map.len() == 1 {
        if let Some(converted) = unwrap_wrapper(&mut map) {
            return converted;
        }
    }

    map.remove("_id");
    Value::Object(
        map.into_iter()
            .map(|(key, value)| (key, sanitize(value)))
            .collect(),
    )
}

fn unwrap_wrapper(map: &mut Map<String, Value>) -> Option<Value> {
    let (key, inner) = map.iter().next()?;
    let converted = match (key.as_str(), inner) {
        ("$oid", Value::String(id)) => Value::String(id.clone()),
        ("$date", inner) => convert_date(inner)?,
        ("$numberDecimal" | "$numberDouble", Value::String(raw)) => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
            .unwrap_or_else(|| Value::String(raw.clone())),
        ("$numberLong" | "$numberInt", Value::String(raw)) => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.clone())),
        _ => return None,
    };
    Some(converted)
}

fn convert_date(inner: &Value) -> Option<Value> {
    let at = match inner {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw).ok()?.naive_utc(),
        Value::Number(millis) => DateTime::from_timestamp_millis(millis.as_i64()?)?.naive_utc(),
        Value::Object(long) => {
            let millis = long.get("$numberLong")?.as_str()?.parse::<i64>().ok()?;
            DateTime::from_timestamp_millis(millis)?.naive_utc()
        }
        _ => return None,
    };
    Some(Value::String(at.format(NAIVE_FORMAT).to_string()))
}
