//! Shared fixtures for Diplostore integration tests.
//!
//! Every test stands up `wiremock` servers for the content CDN and the
//! orders backend, so no real network traffic is made. The helpers here
//! build configurations pointing at those servers and JSON bodies in the
//! CMS wire shape.

use std::time::Duration;

use serde_json::{Value, json};
use url::Url;

use diplostore_storefront::catalog::CatalogClient;
use diplostore_storefront::config::{BackendConfig, ContentConfig};

/// Initialize test logging. Safe to call from every test; only the first
/// call wins.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One CMS story in the listing wire shape.
#[must_use]
pub fn story_json(id: i64, slug: &str, name: &str, price: &str, category: &str) -> Value {
    json!({
        "id": id,
        "slug": slug,
        "content": {
            "name": name,
            "price": price,
            "category": category
        }
    })
}

/// A listing body with an explicit `total` field.
#[must_use]
pub fn stories_body(stories: &[Value], total: u64) -> Value {
    json!({ "stories": stories, "total": total })
}

/// Content API configuration pointing at a mock server.
#[must_use]
pub fn content_config(server_uri: &str, per_page: u32) -> ContentConfig {
    ContentConfig {
        base_url: Url::parse(server_uri).expect("mock server URI parses"),
        token: "test-token".to_string(),
        per_page,
        timeout: Duration::from_secs(5),
    }
}

/// Backend configuration pointing at a mock server.
#[must_use]
pub fn backend_config(server_uri: &str) -> BackendConfig {
    BackendConfig {
        base_url: Url::parse(server_uri).expect("mock server URI parses"),
        timeout: Duration::from_secs(5),
    }
}

/// Catalog client over a mock content server.
#[must_use]
pub fn catalog_client(server_uri: &str, per_page: u32) -> CatalogClient {
    CatalogClient::new(&content_config(server_uri, per_page)).expect("catalog client builds")
}
