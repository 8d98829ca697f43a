use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GEMINI_API_URL: &str = "https://gemini.googleapis.com/v1/text";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub extraction_timeout: Duration,
    pub image_base_url: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("3000")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let gemini_api_key = env_map
            .get("GEMINI_API_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("GEMINI_API_KEY".to_string()))?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .unwrap_or_else(|| "data/meterread.db".to_string());

        let gemini_api_url = env_map
            .get("GEMINI_API_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string());

        let timeout_ms = env_map
            .get("EXTRACTION_TIMEOUT_MS")
            .map(|s| s.as_str())
            .unwrap_or("30000")
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "EXTRACTION_TIMEOUT_MS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let image_base_url = env_map
            .get("IMAGE_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "https://storage.invalid/measures".to_string());
        if image_base_url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "IMAGE_BASE_URL".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            gemini_api_key,
            gemini_api_url,
            extraction_timeout: Duration::from_millis(timeout_ms),
            image_base_url,
        })
    }
}
