//! Clients for the storefront's own backend.
//!
//! The catalog comes from the public content CDN; everything tied to the
//! buyer's identity (checkout initiation, purchase history) goes through
//! the clients here.

pub mod checkout;
pub mod history;

use std::time::Duration;

/// Connect timeout for backend clients, applied alongside the configured
/// request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Leading slice of a response body, for logs and error messages.
fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}
