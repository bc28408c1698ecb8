//! Purchase history for signed-in buyers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, instrument};

use diplostore_core::CurrencyCode;

use crate::config::BackendConfig;

use super::snippet;

/// Errors that can occur fetching purchase history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request.
    #[error("purchase history API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("failed to parse purchase history: {0}")]
    Parse(String),
}

impl HistoryError {
    /// Whether the failure means the stored token is no longer valid and
    /// the buyer should be signed out.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

/// One past order, as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub order_id: String,
    pub total: Decimal,
    pub currency: CurrencyCode,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// POST body for `/purchase-history`.
#[derive(Serialize)]
struct HistoryRequest<'a> {
    token: &'a str,
}

/// Client for the backend's purchase history endpoint.
#[derive(Clone)]
pub struct HistoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HistoryClient {
    /// Build the client from backend configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, HistoryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(super::CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the buyer's past orders, in the order the backend returns
    /// them (newest first).
    ///
    /// # Errors
    ///
    /// [`HistoryError::Api`] on a non-2xx response; a 401 or 403 means the
    /// token went stale (see [`HistoryError::is_unauthorized`]). Transport
    /// and parse failures otherwise.
    #[instrument(skip(self, auth_token))]
    pub async fn fetch(
        &self,
        auth_token: &SecretString,
    ) -> Result<Vec<PurchaseRecord>, HistoryError> {
        let url = format!("{}/purchase-history", self.base_url);
        let body = HistoryRequest {
            token: auth_token.expose_secret(),
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = %status, "purchase history request rejected");
            return Err(HistoryError::Api {
                status: status.as_u16(),
                message: snippet(&message),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|err| {
            error!(
                error = %err,
                body = %snippet(&text),
                "failed to parse purchase history"
            );
            HistoryError::Parse(err.to_string())
        })
    }
}
