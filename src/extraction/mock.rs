//! Mock extraction provider for testing without network calls.

use super::{ExtractionError, ExtractionProvider, RawExtraction};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Returns a fixed outcome for every call and counts invocations.
#[derive(Debug)]
pub struct MockExtractionProvider {
    outcome: Result<RawExtraction, ExtractionError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockExtractionProvider {
    /// Succeed with the given text.
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(RawExtraction::new(text)),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every call with `err`.
    pub fn failing(err: ExtractionError) -> Self {
        Self {
            outcome: Err(err),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering, to keep requests in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionProvider for MockExtractionProvider {
    async fn extract(&self, _image: &str) -> Result<RawExtraction, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_text_and_counts() {
        let mock = MockExtractionProvider::returning("42");
        assert_eq!(mock.extract("img").await.unwrap().text, "42");
        assert_eq!(mock.extract("img").await.unwrap().text, "42");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let mock = MockExtractionProvider::failing(ExtractionError::Network("down".to_string()));
        let err = mock.extract("img").await.unwrap_err();
        assert_eq!(err, ExtractionError::Network("down".to_string()));
        assert_eq!(mock.call_count(), 1);
    }
}
