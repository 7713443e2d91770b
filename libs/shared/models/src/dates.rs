//! Lenient serde helpers for date fields.
//!
//! Records written by other clients may hold full timestamps where a plain
//! date is expected (or carry a UTC offset), so these accept any of
//! `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.f]` and RFC 3339.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{de::Error, Deserialize, Deserializer};

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date '{}'", raw)))
}

pub fn option_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date '{}'", raw))),
        None => Ok(None),
    }
}

pub fn datetime<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime '{}'", raw)))
}

pub fn option_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime '{}'", raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_accept_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09"), Some(expected));
        assert_eq!(parse_date("2024-03-09T14:30:00"), Some(expected));
        assert_eq!(parse_date("2024-03-09T14:30:00Z"), Some(expected));
        assert_eq!(parse_date("09/03/2024"), None);
    }

    #[test]
    fn datetimes_normalize_to_utc() {
        let parsed = parse_datetime("2024-03-09T14:30:00+02:00").unwrap();
        assert_eq!(parsed.to_string(), "2024-03-09 12:30:00");
        let fractional = parse_datetime("2024-03-09T14:30:00.250").unwrap();
        assert_eq!(fractional.and_utc().timestamp_subsec_millis(), 250);
        assert!(parse_datetime("2024-03-09").is_some());
    }

    #[test]
    fn optional_fields_deserialize_null() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "option_datetime")]
            at: Option<NaiveDateTime>,
        }
        let row: Row = serde_json::from_str(r#"{"at": null}"#).unwrap();
        assert!(row.at.is_none());
        let row: Row = serde_json::from_str(r#"{}"#).unwrap();
        assert!(row.at.is_none());
    }
}
