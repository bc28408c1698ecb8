//! Environment-driven configuration for the storefront client.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DIPLOSTORE_CONTENT_TOKEN` - Content API public access token
//! - `DIPLOSTORE_BACKEND_BASE_URL` - Base URL of the checkout/orders backend
//!
//! ## Optional
//! - `DIPLOSTORE_CONTENT_BASE_URL` - Content API base URL (default: `https://api.storyblok.com/v2/cdn`)
//! - `DIPLOSTORE_CURRENCY` - ISO 4217 checkout currency (default: USD)
//! - `DIPLOSTORE_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 15)
//! - `DIPLOSTORE_PER_PAGE` - Catalog page size (default: 100)
//! - `DIPLOSTORE_DATA_DIR` - Directory for durable client state (default: `.diplostore`)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use diplostore_core::CurrencyCode;

const DEFAULT_CONTENT_BASE_URL: &str = "https://api.storyblok.com/v2/cdn";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_PER_PAGE: u32 = 100;
const DEFAULT_DATA_DIR: &str = ".diplostore";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Everything the storefront client needs to run.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Content API (product catalog) settings
    pub content: ContentConfig,
    /// Checkout/orders backend settings
    pub backend: BackendConfig,
    /// Currency used for checkout totals
    pub currency: CurrencyCode,
    /// Directory for durable client state (cart, tokens, checkout marker)
    pub data_dir: PathBuf,
}

/// Content API configuration.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Base URL, e.g. `https://api.storyblok.com/v2/cdn`
    pub base_url: Url,
    /// Public CDN access token (safe to embed client-side)
    pub token: String,
    /// Page size for catalog listings
    pub per_page: u32,
    /// Request timeout
    pub timeout: Duration,
}

/// Checkout/orders backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the orders backend
    pub base_url: Url,
    /// Request timeout
    pub timeout: Duration,
}

impl StorefrontConfig {
    /// Read configuration from the environment, consulting a `.env` file
    /// first when one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; real env vars still apply.
        let _ = dotenvy::dotenv();

        let timeout = Duration::from_secs(parse_u64(
            "DIPLOSTORE_HTTP_TIMEOUT_SECS",
            &get_env_or_default("DIPLOSTORE_HTTP_TIMEOUT_SECS", &DEFAULT_HTTP_TIMEOUT_SECS.to_string()),
        )?);

        let content = ContentConfig {
            base_url: parse_url(
                "DIPLOSTORE_CONTENT_BASE_URL",
                &get_env_or_default("DIPLOSTORE_CONTENT_BASE_URL", DEFAULT_CONTENT_BASE_URL),
            )?,
            token: get_required_env("DIPLOSTORE_CONTENT_TOKEN")?,
            per_page: parse_u32(
                "DIPLOSTORE_PER_PAGE",
                &get_env_or_default("DIPLOSTORE_PER_PAGE", &DEFAULT_PER_PAGE.to_string()),
            )?,
            timeout,
        };

        let backend = BackendConfig {
            base_url: parse_url(
                "DIPLOSTORE_BACKEND_BASE_URL",
                &get_required_env("DIPLOSTORE_BACKEND_BASE_URL")?,
            )?,
            timeout,
        };

        let currency = get_env_or_default("DIPLOSTORE_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("DIPLOSTORE_CURRENCY".to_string(), e))?;

        let data_dir = PathBuf::from(get_env_or_default("DIPLOSTORE_DATA_DIR", DEFAULT_DATA_DIR));

        Ok(Self {
            content,
            backend,
            currency,
            data_dir,
        })
    }
}

// =============================================================================
// Env helpers
// =============================================================================

/// An environment variable that must be set.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// An environment variable with a fallback value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a base URL, attributing failures to the variable that held it.
fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_valid() {
        let url = parse_url("TEST_VAR", "https://api.example.com/v2/cdn").unwrap();
        assert_eq!(url.host_str(), Some("api.example.com"));
    }

    #[test]
    fn test_parse_url_invalid() {
        let result = parse_url("TEST_VAR", "not a url");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "TEST_VAR"));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_u64("T", "15").unwrap(), 15);
        assert_eq!(parse_u32("T", "100").unwrap(), 100);
        assert!(parse_u32("T", "lots").is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("DIPLOSTORE_CONTENT_TOKEN".to_string());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: DIPLOSTORE_CONTENT_TOKEN"
        );
    }
}
