pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod extraction;
pub mod images;
pub mod pipeline;

pub use config::Config;
pub use db::{init_db, MeasureStore, Repository};
pub use domain::{
    BillingPeriod, MeasureKey, MeasureType, MeasurementRecord, MeasurementRequest,
    MeasurementResult,
};
pub use error::AppError;
pub use extraction::{
    ExtractionError, ExtractionProvider, GeminiExtractionProvider, MockExtractionProvider,
};
pub use images::{ContentAddressedImageStore, ImageStore};
pub use pipeline::{DedupGuard, MeasurePipeline, PipelineError};
