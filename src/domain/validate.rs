//! Validation of the raw `/upload` body.
//!
//! Works on the untyped JSON value so that wrong field types are rejected the
//! same way as missing fields. The first violation wins.

use crate::domain::{MeasureType, MeasurementRequest};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} must be a string")]
    NotAString(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("measure_datetime is not a valid ISO-8601 timestamp: {0}")]
    InvalidDatetime(String),
    #[error("measure_type must be WATER or GAS, got {0}")]
    InvalidMeasureType(String),
}

pub fn validate(raw: &Value) -> Result<MeasurementRequest, ValidationError> {
    let body = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let image = string_field(body, "image")?;
    let customer_code = string_field(body, "customer_code")?;
    let measure_datetime = string_field(body, "measure_datetime")?;
    let measure_type = string_field(body, "measure_type")?;

    let measure_datetime = parse_measure_datetime(measure_datetime)
        .ok_or_else(|| ValidationError::InvalidDatetime(measure_datetime.to_string()))?;
    let measure_type = measure_type
        .parse::<MeasureType>()
        .map_err(|e| ValidationError::InvalidMeasureType(e.0))?;

    Ok(MeasurementRequest {
        image: image.to_string(),
        customer_code: customer_code.to_string(),
        measure_datetime,
        measure_type,
    })
}

fn string_field<'a>(
    body: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, ValidationError> {
    match body.get(name) {
        None | Some(Value::Null) => Err(ValidationError::Missing(name)),
        Some(Value::String(s)) if s.is_empty() => Err(ValidationError::Empty(name)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ValidationError::NotAString(name)),
    }
}

/// Accepts RFC 3339 timestamps, offset-less date-times (taken as UTC) and bare dates.
pub fn parse_measure_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}
