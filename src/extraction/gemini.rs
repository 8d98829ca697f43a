//! Gemini text-extraction client.

use super::{ExtractionError, ExtractionProvider, RawExtraction, EXTRACTION_PROMPT};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Calls the Gemini endpoint with a bearer token.
///
/// The whole exchange, body read included, is bounded by `timeout`.
#[derive(Clone)]
pub struct GeminiExtractionProvider {
    client: Client,
    api_url: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiExtractionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiExtractionProvider")
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiExtractionProvider {
    pub fn new(
        api_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Client(e.to_string()))?;
        Ok(Self {
            client,
            api_url,
            api_key,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ExtractionError> {
        Self::new(
            config.gemini_api_url.clone(),
            config.gemini_api_key.clone(),
            config.extraction_timeout,
        )
    }

    async fn post_extraction(&self, image: &str) -> Result<RawExtraction, ExtractionError> {
        let payload = serde_json::json!({
            "image": image,
            "prompt": EXTRACTION_PROMPT,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| match self.classify(e) {
                ExtractionError::Network(msg) => ExtractionError::MalformedResponse(msg),
                other => other,
            })?;

        parse_extraction_body(&body)
    }

    fn classify(&self, err: reqwest::Error) -> ExtractionError {
        if err.is_timeout() {
            ExtractionError::Timeout(self.timeout)
        } else {
            ExtractionError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl ExtractionProvider for GeminiExtractionProvider {
    async fn extract(&self, image: &str) -> Result<RawExtraction, ExtractionError> {
        debug!(
            image_len = image.len(),
            url = %self.api_url,
            "Submitting image for extraction"
        );

        tokio::time::timeout(self.timeout, self.post_extraction(image))
            .await
            .map_err(|_| ExtractionError::Timeout(self.timeout))?
    }
}

/// Pull the free text out of a provider response.
///
/// Accepts a flat `{"text": ...}` body and the `generateContent` shape
/// (`candidates[0].content.parts[*].text`).
fn parse_extraction_body(body: &serde_json::Value) -> Result<RawExtraction, ExtractionError> {
    if let Some(text) = body.get("text").and_then(|v| v.as_str()) {
        return Ok(RawExtraction::new(text));
    }

    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(|v| v.as_array());
    if let Some(parts) = parts {
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        if !text.is_empty() {
            return Ok(RawExtraction::new(text));
        }
    }

    Err(ExtractionError::MalformedResponse(
        "response has no text field".to_string(),
    ))
}
