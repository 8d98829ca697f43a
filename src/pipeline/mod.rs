//! Upload pipeline: validate, reserve the period, extract, assemble, commit.

pub mod assemble;
pub mod dedup;

pub use assemble::{assemble, parse_measure_value, AssemblyError};
pub use dedup::{DedupError, DedupGuard, Reservation};

use crate::domain::{validate, MeasurementRecord, MeasurementResult, ValidationError};
use crate::extraction::{ExtractionError, ExtractionProvider};
use crate::images::ImageStore;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Last stage a request reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Validated,
    DedupChecked,
    Extracted,
    Assembled,
    Responded,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Received => "received",
            PipelineStage::Validated => "validated",
            PipelineStage::DedupChecked => "dedup_checked",
            PipelineStage::Extracted => "extracted",
            PipelineStage::Assembled => "assembled",
            PipelineStage::Responded => "responded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid data: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Dedup(#[from] DedupError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

impl PipelineError {
    /// Client-caused failures; everything else is an internal error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_) | PipelineError::Dedup(DedupError::DoubleReport(_))
        )
    }
}

/// Processes uploads; shared across requests.
#[derive(Clone)]
pub struct MeasurePipeline {
    guard: DedupGuard,
    extractor: Arc<dyn ExtractionProvider>,
    images: Arc<dyn ImageStore>,
}

impl MeasurePipeline {
    pub fn new(
        guard: DedupGuard,
        extractor: Arc<dyn ExtractionProvider>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            guard,
            extractor,
            images,
        }
    }

    pub fn guard(&self) -> &DedupGuard {
        &self.guard
    }

    /// Run one upload body through every stage.
    ///
    /// Nothing is persisted unless all stages succeed.
    pub async fn process(
        &self,
        raw: &serde_json::Value,
    ) -> Result<MeasurementResult, PipelineError> {
        let mut stage = PipelineStage::Received;
        let outcome = self.run(raw, &mut stage).await;

        if let Err(e) = &outcome {
            if e.is_client_error() {
                warn!(%stage, error = %e, "Upload rejected");
            } else {
                error!(%stage, error = %e, "Upload failed");
            }
        }
        outcome
    }

    async fn run(
        &self,
        raw: &serde_json::Value,
        stage: &mut PipelineStage,
    ) -> Result<MeasurementResult, PipelineError> {
        let request = validate(raw)?;
        *stage = PipelineStage::Validated;

        let reservation = self.guard.check_and_reserve(request.key()).await?;
        *stage = PipelineStage::DedupChecked;

        let extraction = self.extractor.extract(&request.image).await?;
        *stage = PipelineStage::Extracted;

        let image_url = self
            .images
            .store(&request.image)
            .await
            .map_err(AssemblyError::from)?;
        let result = assemble(&extraction, image_url)?;
        *stage = PipelineStage::Assembled;

        let record = MeasurementRecord::from_result(&request, &result);
        reservation.commit(&record).await?;
        *stage = PipelineStage::Responded;

        info!(
            customer_code = %record.customer_code,
            measure_type = %record.measure_type,
            billing_period = %record.billing_period,
            measure_uuid = %record.measure_uuid,
            measure_value = record.measure_value,
            "Reading recorded"
        );
        Ok(result)
    }
}
