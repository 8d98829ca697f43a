use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::AppState;
use crate::domain::{MeasureType, MeasurementRecord};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub measure_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub customer_code: String,
    pub measures: Vec<MeasureDto>,
}

#[derive(Debug, Serialize)]
pub struct MeasureDto {
    pub measure_uuid: Uuid,
    pub measure_datetime: DateTime<Utc>,
    pub measure_type: MeasureType,
    pub measure_value: f64,
    pub image_url: String,
}

impl From<MeasurementRecord> for MeasureDto {
    fn from(r: MeasurementRecord) -> Self {
        Self {
            measure_uuid: r.measure_uuid,
            measure_datetime: r.measure_datetime,
            measure_type: r.measure_type,
            measure_value: r.measure_value,
            image_url: r.image_url,
        }
    }
}

/// `GET /{customer_code}/list?measure_type=WATER|GAS`.
pub async fn list_measures(
    Path(customer_code): Path<String>,
    Query(params): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse>, AppError> {
    let measure_type = match params.measure_type.as_deref() {
        None => None,
        Some(raw) => Some(MeasureType::parse_lenient(raw).ok_or_else(|| {
            AppError::InvalidType(format!("measure_type must be WATER or GAS, got {}", raw))
        })?),
    };

    let records = state
        .repo
        .list_measures(&customer_code, measure_type)
        .await?;
    if records.is_empty() {
        return Err(AppError::MeasuresNotFound("No readings found".into()));
    }

    Ok(Json(ListResponse {
        customer_code,
        measures: records.into_iter().map(MeasureDto::from).collect(),
    }))
}
