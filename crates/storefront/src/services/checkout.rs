//! Checkout initiation against the orders backend.
//!
//! [`CheckoutClient`] posts the cart to `/checkout` and hands the returned
//! payment URL back to the host for redirection. The cart survives the
//! whole flow untouched: only landing on the success page (payment
//! confirmed) clears it, via [`finalize_success`]. A
//! `checkout-in-progress` snapshot is persisted right before the redirect
//! so an interrupted payment can be recovered with [`pending_checkout`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, instrument, warn};

use diplostore_core::CurrencyCode;

use crate::cart::{CartItem, CartStore};
use crate::config::BackendConfig;
use crate::storage::{StorageBackend, StorageError, keys};

use super::snippet;

/// Errors that can occur initiating a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// An earlier checkout is still submitting or redirecting.
    #[error("a checkout is already in progress")]
    InProgress,

    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the checkout.
    #[error("checkout API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The backend accepted the order but sent no payment URL.
    #[error("checkout response did not include a redirect URL")]
    MissingRedirectUrl,

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where a checkout attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    /// The order payload is on its way to the backend.
    Submitting,
    /// The backend returned a payment URL; the host is redirecting.
    Redirecting,
    /// The last attempt failed; `begin` may be called again.
    Failed,
}

/// Snapshot persisted under `checkout-in-progress` while the buyer is away
/// at the payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutMarker {
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub started_at: DateTime<Utc>,
}

/// POST body for `/checkout`.
#[derive(Serialize)]
struct CheckoutPayload<'a> {
    /// Backend session token; null for guest checkout.
    token: Option<&'a str>,
    items: &'a [CartItem],
    total: Decimal,
    currency: CurrencyCode,
    timestamp: DateTime<Utc>,
}

/// 2xx reply from `/checkout`.
#[derive(Deserialize)]
struct CheckoutReply {
    #[serde(alias = "url")]
    checkout_url: Option<String>,
}

// =============================================================================
// CheckoutClient
// =============================================================================

/// Client for the backend's checkout endpoint.
///
/// Cheap to clone; every clone shares the same state machine.
#[derive(Clone)]
pub struct CheckoutClient {
    inner: Arc<CheckoutClientInner>,
}

struct CheckoutClientInner {
    client: reqwest::Client,
    base_url: String,
    currency: CurrencyCode,
    storage: Arc<dyn StorageBackend>,
    state: Mutex<CheckoutState>,
}

impl CheckoutClient {
    /// Build the client over backend configuration and the storage that
    /// holds the checkout marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(
        config: &BackendConfig,
        currency: CurrencyCode,
        storage: Arc<dyn StorageBackend>,
    ) -> Result<Self, CheckoutError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(super::CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(CheckoutClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                currency,
                storage,
                state: Mutex::new(CheckoutState::Idle),
            }),
        })
    }

    /// Current state of the checkout state machine.
    #[must_use]
    pub fn state(&self) -> CheckoutState {
        *self.lock_state()
    }

    /// Begin a checkout for the cart's current contents.
    ///
    /// On success the payment URL is returned, the checkout marker is
    /// persisted, and the state moves to Redirecting. The cart is not
    /// cleared; only confirmed payment does that.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::EmptyCart`] without touching network or state;
    /// [`CheckoutError::InProgress`] while an earlier begin is submitting
    /// or redirecting. Transport, API, and parse failures move the state
    /// to Failed and leave the cart and any existing marker intact, so the
    /// buyer can retry.
    #[instrument(skip(self, cart, auth_token))]
    pub async fn begin(
        &self,
        cart: &CartStore,
        auth_token: Option<&SecretString>,
    ) -> Result<String, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        {
            let mut state = self.lock_state();
            if matches!(
                *state,
                CheckoutState::Submitting | CheckoutState::Redirecting
            ) {
                return Err(CheckoutError::InProgress);
            }
            *state = CheckoutState::Submitting;
        }

        match self.submit(cart, auth_token).await {
            Ok(redirect) => {
                *self.lock_state() = CheckoutState::Redirecting;
                Ok(redirect)
            }
            Err(err) => {
                *self.lock_state() = CheckoutState::Failed;
                Err(err)
            }
        }
    }

    async fn submit(
        &self,
        cart: &CartStore,
        auth_token: Option<&SecretString>,
    ) -> Result<String, CheckoutError> {
        let items = cart.items();
        let total = cart.total_price();
        let started_at = Utc::now();

        let payload = CheckoutPayload {
            token: auth_token.map(ExposeSecret::expose_secret),
            items: &items,
            total,
            currency: self.inner.currency,
            timestamp: started_at,
        };

        let url = format!("{}/checkout", self.inner.base_url);
        let response = self.inner.client.post(&url).json(&payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = %status, "checkout rejected by the backend");
            return Err(CheckoutError::Api {
                status: status.as_u16(),
                message: snippet(&message),
            });
        }

        let text = response.text().await?;
        let reply: CheckoutReply = serde_json::from_str(&text).map_err(|err| {
            error!(
                error = %err,
                body = %snippet(&text),
                "failed to parse checkout response"
            );
            CheckoutError::Parse(err)
        })?;

        let redirect = reply
            .checkout_url
            .filter(|url| !url.is_empty())
            .ok_or(CheckoutError::MissingRedirectUrl)?;

        self.persist_marker(items, total, started_at);

        Ok(redirect)
    }

    /// Best effort: a missing marker only degrades recovery, it must not
    /// fail a checkout the backend already accepted.
    fn persist_marker(&self, items: Vec<CartItem>, total: Decimal, started_at: DateTime<Utc>) {
        let marker = CheckoutMarker {
            items,
            total,
            started_at,
        };
        let persisted = serde_json::to_string(&marker)
            .map_err(StorageError::from)
            .and_then(|payload| self.inner.storage.set(keys::CHECKOUT_IN_PROGRESS, &payload));
        if let Err(err) = persisted {
            warn!(error = %err, "failed to persist checkout marker");
        }
    }

    /// Return to Idle so a new checkout can begin, e.g. after the buyer
    /// came back from the payment page without paying.
    pub fn reset(&self) {
        *self.lock_state() = CheckoutState::Idle;
    }

    fn lock_state(&self) -> MutexGuard<'_, CheckoutState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CheckoutClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutClient")
            .field("base_url", &self.inner.base_url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Recovery helpers
// =============================================================================

/// Landing on the success page confirms payment: drop the stored cart and
/// the checkout marker.
///
/// # Errors
///
/// Returns an error if the backing store cannot be written.
pub fn finalize_success(storage: &dyn StorageBackend) -> Result<(), StorageError> {
    storage.remove(keys::SHOPPING_CART)?;
    storage.remove(keys::CHECKOUT_IN_PROGRESS)
}

/// Read back the snapshot of an initiated but unconfirmed checkout, if one
/// exists. A corrupt marker reads as absent.
///
/// # Errors
///
/// Returns an error if the backing store cannot be read.
pub fn pending_checkout(
    storage: &dyn StorageBackend,
) -> Result<Option<CheckoutMarker>, StorageError> {
    let Some(raw) = storage.get(keys::CHECKOUT_IN_PROGRESS)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(marker) => Ok(Some(marker)),
        Err(err) => {
            warn!(error = %err, "discarding corrupt checkout marker");
            Ok(None)
        }
    }
}
