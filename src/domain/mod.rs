//! Domain types for meter readings.
//!
//! This module provides:
//! - `MeasureType`, `BillingPeriod` and the deduplication `MeasureKey`
//! - The request, record and result entities of an upload
//! - Validation of raw upload bodies

pub mod measure;
pub mod validate;

pub use measure::{
    BillingPeriod, MeasureKey, MeasureType, MeasureTypeParseError, MeasurementRecord,
    MeasurementRequest, MeasurementResult,
};
pub use validate::{validate, ValidationError};
