use crate::pipeline::{DedupError, PipelineError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Double report: {0}")]
    DoubleReport(String),
    #[error("Invalid type: {0}")]
    InvalidType(String),
    #[error("Not found: {0}")]
    MeasuresNotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidData(_) => "INVALID_DATA",
            AppError::DoubleReport(_) => "DOUBLE_REPORT",
            AppError::InvalidType(_) => "INVALID_TYPE",
            AppError::MeasuresNotFound(_) => "MEASURES_NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidData(_) | AppError::InvalidType(_) => StatusCode::BAD_REQUEST,
            AppError::DoubleReport(_) => StatusCode::CONFLICT,
            AppError::MeasuresNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "Database error");
        AppError::Internal("Internal server error".into())
    }
}

/// Internal causes are logged by the pipeline and not echoed to the caller.
impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(e) => AppError::InvalidData(e.to_string()),
            PipelineError::Dedup(DedupError::DoubleReport(_)) => AppError::DoubleReport(
                "A reading of this type already exists for the billing period".into(),
            ),
            PipelineError::Dedup(_) => AppError::Internal("Failed to record the reading".into()),
            PipelineError::Extraction(_) => {
                AppError::Internal("Failed to extract a reading from the image".into())
            }
            PipelineError::Assembly(_) => {
                AppError::Internal("Failed to read a numeric value from the image".into())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.error_code();
        let error_description = match self {
            AppError::InvalidData(msg)
            | AppError::DoubleReport(msg)
            | AppError::InvalidType(msg)
            | AppError::MeasuresNotFound(msg)
            | AppError::Internal(msg) => msg,
        };

        let body = Json(json!({
            "error_code": error_code,
            "error_description": error_description,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValidationError;
    use crate::extraction::ExtractionError;
    use crate::pipeline::AssemblyError;
    use std::time::Duration;

    fn code_and_status(err: PipelineError) -> (&'static str, StatusCode) {
        let app = AppError::from(err);
        (app.error_code(), app.status())
    }

    #[test]
    fn test_pipeline_errors_map_to_three_codes() {
        assert_eq!(
            code_and_status(ValidationError::Missing("image").into()),
            ("INVALID_DATA", StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            code_and_status(ExtractionError::Timeout(Duration::from_secs(1)).into()),
            ("INTERNAL_SERVER_ERROR", StatusCode::INTERNAL_SERVER_ERROR)
        );
        assert_eq!(
            code_and_status(ExtractionError::HttpStatus {
                status: 409,
                message: "Conflict".into()
            }
            .into()),
            ("INTERNAL_SERVER_ERROR", StatusCode::INTERNAL_SERVER_ERROR)
        );
        assert_eq!(
            code_and_status(AssemblyError::InvalidValue("abc".into()).into()),
            ("INTERNAL_SERVER_ERROR", StatusCode::INTERNAL_SERVER_ERROR)
        );
        assert_eq!(
            code_and_status(DedupError::Store(sqlx::Error::PoolTimedOut).into()),
            ("INTERNAL_SERVER_ERROR", StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = AppError::InvalidData("image is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["error_code"], "INVALID_DATA");
        assert_eq!(v["error_description"], "image is required");
    }
}
