use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::AppState;
use crate::domain::MeasurementResult;
use crate::error::AppError;

/// `POST /upload`. Malformed or oversized JSON is reported as `INVALID_DATA`.
pub async fn upload(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<MeasurementResult>, AppError> {
    let Json(raw) = body.map_err(|e| {
        tracing::warn!(error = %e, "Rejected upload body");
        AppError::InvalidData(e.body_text())
    })?;

    let result = state.pipeline.process(&raw).await?;
    Ok(Json(result))
}
