//! Extraction provider abstraction: turns a meter photograph into free text.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod gemini;
pub mod mock;

pub use gemini::GeminiExtractionProvider;
pub use mock::MockExtractionProvider;

/// Instruction sent alongside every image.
pub const EXTRACTION_PROMPT: &str = "Extract the numeric meter reading from this image.";

/// Unparsed text returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExtraction {
    pub text: String,
}

impl RawExtraction {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Image-understanding service that extracts a reading from a picture.
///
/// Implementations perform a single attempt per call; callers decide what a
/// failure means for the request.
#[async_trait]
pub trait ExtractionProvider: Send + Sync + fmt::Debug {
    /// Submit a base64 image with [`EXTRACTION_PROMPT`] and return the provider's text.
    async fn extract(&self, image: &str) -> Result<RawExtraction, ExtractionError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Connection, DNS or TLS failure.
    #[error("network error: {0}")]
    Network(String),
    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),
    #[error("provider returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("failed to build provider client: {0}")]
    Client(String),
}
