//! HTTP transport for the content API.
//!
//! Products live in a headless CMS as "stories" under the `products/`
//! folder. This module owns the wire DTOs and the raw requests;
//! normalization into domain types happens in [`convert`](super::convert).

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, instrument};

use crate::config::ContentConfig;

use super::CatalogError;

/// CMS folder that holds product stories.
const PRODUCTS_FOLDER: &str = "products/";

/// Connect timeout, applied alongside the configured request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Wire DTOs
// =============================================================================

/// Listing envelope: `GET {base}/stories`.
#[derive(Debug, Deserialize)]
pub(super) struct StoriesResponse {
    #[serde(default)]
    pub stories: Vec<StoryDto>,
    /// Listing total. The CDN may report it here, in a `total` response
    /// header, or not at all.
    #[serde(default)]
    pub total: Option<u64>,
}

/// Detail envelope: `GET {base}/stories/products/{slug}`.
#[derive(Debug, Deserialize)]
pub(super) struct StoryResponse {
    pub story: StoryDto,
}

/// A CMS story. Only the fields the storefront reads are modeled.
#[derive(Debug, Deserialize)]
pub(super) struct StoryDto {
    pub id: i64,
    pub slug: String,
    #[serde(default)]
    pub content: StoryContent,
}

/// Product fields as authored in the CMS; everything is optional on the
/// wire.
#[derive(Debug, Default, Deserialize)]
pub(super) struct StoryContent {
    pub name: Option<String>,
    pub price: Option<WireAmount>,
    pub regular_price: Option<WireAmount>,
    pub sale_price: Option<WireAmount>,
    pub stock_status: Option<String>,
    pub image: Option<ImageField>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Prices arrive as either a JSON string or a bare number, depending on how
/// the entry was authored.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum WireAmount {
    Text(String),
    Number(serde_json::Number),
}

impl WireAmount {
    /// Display form of the amount, as authored.
    pub(super) fn into_display(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// The CMS image field (`{"filename": "https://..."}`).
#[derive(Debug, Deserialize)]
pub(super) struct ImageField {
    pub filename: Option<String>,
}

/// One fetched listing page, before normalization.
#[derive(Debug)]
pub(super) struct ListingPage {
    pub stories: Vec<StoryDto>,
    /// `total` response header, when the CDN sent one.
    pub header_total: Option<u64>,
    /// `total` body field, when present.
    pub body_total: Option<u64>,
}

/// Authoritative listing total, in fallback order: the `total` response
/// header, then the body `total` field, then the page length after
/// category filtering. The header is what the CDN actually sends for the
/// unfiltered listing; the last fallback keeps client-side filtering
/// coherent when neither is present.
pub(super) fn derive_total(
    header_total: Option<u64>,
    body_total: Option<u64>,
    page_len: usize,
) -> u64 {
    header_total
        .or(body_total)
        .unwrap_or(page_len as u64)
}

// =============================================================================
// ContentApi
// =============================================================================

/// Low-level client for the content CDN.
pub(super) struct ContentApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
    per_page: u32,
}

impl ContentApi {
    /// Build the transport from content API configuration.
    pub(super) fn new(config: &ContentConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            token: config.token.clone(),
            per_page: config.per_page,
        })
    }

    /// Fetch one listing page of product stories.
    #[instrument(skip(self))]
    pub(super) async fn list_stories(
        &self,
        page: u32,
        sort_by: &str,
        search_term: Option<&str>,
    ) -> Result<ListingPage, CatalogError> {
        let url = format!("{}/stories", self.base_url);
        let per_page = self.per_page.to_string();
        let page_param = page.to_string();

        let mut params = vec![
            ("token", self.token.as_str()),
            ("starts_with", PRODUCTS_FOLDER),
            ("per_page", per_page.as_str()),
            ("page", page_param.as_str()),
            ("sort_by", sort_by),
        ];
        if let Some(term) = search_term {
            params.push(("search_term", term));
        }

        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited(retry_after_secs(&response)));
        }

        let header_total = response
            .headers()
            .get("total")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        // Read the body as text first for better error diagnostics.
        let text = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %snippet(&text),
                "content API returned non-success status"
            );
            return Err(CatalogError::UnexpectedStatus {
                status: status.as_u16(),
                message: snippet(&text),
            });
        }

        let parsed: StoriesResponse = serde_json::from_str(&text).map_err(|err| {
            error!(
                error = %err,
                body = %snippet(&text),
                "failed to parse content API listing"
            );
            CatalogError::Parse(err)
        })?;

        Ok(ListingPage {
            stories: parsed.stories,
            header_total,
            body_total: parsed.total,
        })
    }

    /// Fetch a single product story by slug.
    #[instrument(skip(self), fields(slug = %slug))]
    pub(super) async fn get_story(&self, slug: &str) -> Result<StoryDto, CatalogError> {
        let url = format!("{}/stories/{PRODUCTS_FOLDER}{slug}", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(slug.to_string()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited(retry_after_secs(&response)));
        }

        let text = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %snippet(&text),
                "content API returned non-success status"
            );
            return Err(CatalogError::UnexpectedStatus {
                status: status.as_u16(),
                message: snippet(&text),
            });
        }

        let parsed: StoryResponse = serde_json::from_str(&text).map_err(|err| {
            error!(
                error = %err,
                body = %snippet(&text),
                "failed to parse content API story"
            );
            CatalogError::Parse(err)
        })?;

        Ok(parsed.story)
    }
}

/// `Retry-After` seconds, defaulting to 1 when absent or malformed.
fn retry_after_secs(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("Retry-After")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1)
}

/// Leading slice of a response body, for logs and error messages.
fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}
