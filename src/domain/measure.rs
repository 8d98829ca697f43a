//! Meter readings: measure type, billing period, request, stored record and response.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of utility meter pictured in the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeasureType {
    Water,
    Gas,
}

impl MeasureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureType::Water => "WATER",
            MeasureType::Gas => "GAS",
        }
    }

    /// Case-insensitive parse used for query strings.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        s.trim().to_ascii_uppercase().parse().ok()
    }
}

impl fmt::Display for MeasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureTypeParseError(pub String);

impl fmt::Display for MeasureTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown measure type: {}", self.0)
    }
}

impl std::error::Error for MeasureTypeParseError {}

impl FromStr for MeasureType {
    type Err = MeasureTypeParseError;

    /// Exact match on the wire literals `WATER` and `GAS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WATER" => Ok(MeasureType::Water),
            "GAS" => Ok(MeasureType::Gas),
            other => Err(MeasureTypeParseError(other.to_string())),
        }
    }
}

/// The (year, month) bucket a reading is billed in.
///
/// Derived from the reading timestamp in UTC. Formats as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(datetime: &DateTime<Utc>) -> Self {
        Self {
            year: datetime.year(),
            month: datetime.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid billing period: {}", s))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| format!("invalid billing period year: {}", s))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| format!("invalid billing period month: {}", s))?;
        BillingPeriod::new(year, month).ok_or_else(|| format!("month out of range: {}", s))
    }
}

/// Deduplication key: one reading per customer, type and billing period.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeasureKey {
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub billing_period: BillingPeriod,
}

impl fmt::Display for MeasureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.customer_code, self.measure_type, self.billing_period
        )
    }
}

/// A validated upload, ready for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRequest {
    /// Base64 image payload. Never decoded here.
    pub image: String,
    pub customer_code: String,
    pub measure_datetime: DateTime<Utc>,
    pub measure_type: MeasureType,
}

impl MeasurementRequest {
    pub fn billing_period(&self) -> BillingPeriod {
        BillingPeriod::of(&self.measure_datetime)
    }

    pub fn key(&self) -> MeasureKey {
        MeasureKey {
            customer_code: self.customer_code.clone(),
            measure_type: self.measure_type,
            billing_period: self.billing_period(),
        }
    }
}

/// A committed reading. Written once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub measure_uuid: Uuid,
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub billing_period: BillingPeriod,
    pub measure_datetime: DateTime<Utc>,
    pub measure_value: f64,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl MeasurementRecord {
    pub fn from_result(request: &MeasurementRequest, result: &MeasurementResult) -> Self {
        Self {
            measure_uuid: result.measure_uuid,
            customer_code: request.customer_code.clone(),
            measure_type: request.measure_type,
            billing_period: request.billing_period(),
            measure_datetime: request.measure_datetime,
            measure_value: result.measure_value,
            image_url: result.image_url.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> MeasureKey {
        MeasureKey {
            customer_code: self.customer_code.clone(),
            measure_type: self.measure_type,
            billing_period: self.billing_period,
        }
    }
}

/// Response body of a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementResult {
    pub image_url: String,
    pub measure_value: f64,
    pub measure_uuid: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_measure_type_exact_parse() {
        assert_eq!("WATER".parse::<MeasureType>().unwrap(), MeasureType::Water);
        assert_eq!("GAS".parse::<MeasureType>().unwrap(), MeasureType::Gas);
        assert!("water".parse::<MeasureType>().is_err());
        assert!("ELECTRIC".parse::<MeasureType>().is_err());
    }

    #[test]
    fn test_measure_type_lenient_parse() {
        assert_eq!(MeasureType::parse_lenient("water"), Some(MeasureType::Water));
        assert_eq!(MeasureType::parse_lenient(" Gas "), Some(MeasureType::Gas));
        assert_eq!(MeasureType::parse_lenient("steam"), None);
    }

    #[test]
    fn test_measure_type_serialization() {
        let json = serde_json::to_string(&MeasureType::Water).unwrap();
        assert_eq!(json, "\"WATER\"");
    }

    #[test]
    fn test_billing_period_from_datetime() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let period = BillingPeriod::of(&dt);
        assert_eq!(period.year(), 2024);
        assert_eq!(period.month(), 5);
        assert_eq!(period.to_string(), "2024-05");
    }

    #[test]
    fn test_billing_period_round_trips_through_string() {
        let period: BillingPeriod = "2023-12".parse().unwrap();
        assert_eq!(period, BillingPeriod::new(2023, 12).unwrap());
        assert!("2023-13".parse::<BillingPeriod>().is_err());
        assert!("202312".parse::<BillingPeriod>().is_err());
    }

    #[test]
    fn test_same_month_same_key() {
        let early = MeasurementRequest {
            image: "aGVsbG8=".to_string(),
            customer_code: "CUST1".to_string(),
            measure_datetime: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            measure_type: MeasureType::Water,
        };
        let late = MeasurementRequest {
            measure_datetime: Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap(),
            ..early.clone()
        };
        let next = MeasurementRequest {
            measure_datetime: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            ..early.clone()
        };
        assert_eq!(early.key(), late.key());
        assert_ne!(early.key(), next.key());
    }

    #[test]
    fn test_result_serializes_snake_case() {
        let result = MeasurementResult {
            image_url: "https://x/y.jpg".to_string(),
            measure_value: 123.45,
            measure_uuid: Uuid::nil(),
        };
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["image_url"], "https://x/y.jpg");
        assert_eq!(v["measure_value"], 123.45);
        assert_eq!(v["measure_uuid"], "00000000-0000-0000-0000-000000000000");
    }
}
