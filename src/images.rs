//! Image storage collaborator: issues the URL returned with a reading.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ImageStoreError {
    #[error("image storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ImageStore: Send + Sync + std::fmt::Debug {
    /// Store a base64 image and return the URL it is reachable at.
    async fn store(&self, image: &str) -> Result<String, ImageStoreError>;
}

/// Issues `{base_url}/{sha256(image)}` without persisting any bytes.
///
/// The same payload always maps to the same URL.
#[derive(Debug, Clone)]
pub struct ContentAddressedImageStore {
    base_url: String,
}

impl ContentAddressedImageStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, image: &str) -> String {
        let digest = Sha256::digest(image.as_bytes());
        format!("{}/{}", self.base_url, hex::encode(digest))
    }
}

#[async_trait]
impl ImageStore for ContentAddressedImageStore {
    async fn store(&self, image: &str) -> Result<String, ImageStoreError> {
        Ok(self.url_for(image))
    }
}
