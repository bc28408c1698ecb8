//! Domain types for the product catalog.

use serde::{Deserialize, Serialize};

use diplostore_core::{ProductId, StockStatus};

/// A normalized catalog product.
///
/// Every field is filled during conversion from the wire format; missing
/// content falls back to placeholders so the host never renders holes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// URL-safe handle, used for detail fetches.
    pub slug: String,
    pub name: String,
    /// Display price string as authored in the CMS (e.g. "12.50").
    pub price: String,
    /// Price before any discount; falls back to `price` when absent.
    pub regular_price: String,
    /// Discounted price, present only while the product is on sale.
    pub sale_price: Option<String>,
    pub stock_status: StockStatus,
    /// Image URL; a placeholder when the CMS has none.
    pub image: String,
    pub description: String,
    pub category: String,
}

impl Product {
    /// Whether a sale price is active.
    #[must_use]
    pub const fn on_sale(&self) -> bool {
        self.sale_price.is_some()
    }

    /// The price a buyer pays right now.
    #[must_use]
    pub fn effective_price(&self) -> &str {
        self.sale_price.as_deref().unwrap_or(&self.price)
    }
}

/// Catalog sort orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    DateDesc,
}

impl SortOption {
    /// Wire value for the content API's `sort_by` parameter.
    ///
    /// Relevance has no dedicated server-side ordering; it maps to newest
    /// first, same as `DateDesc`.
    #[must_use]
    pub const fn sort_param(self) -> &'static str {
        match self {
            Self::Relevance | Self::DateDesc => "published_at:desc",
            Self::PriceAsc => "content.price:asc",
            Self::PriceDesc => "content.price:desc",
        }
    }
}

/// Listing load phase, for skeleton vs spinner rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    /// The first page is loading (full grid skeleton).
    Initial,
    /// A later page is being appended (footer spinner).
    More,
}

/// Outcome of a listing fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFetch {
    /// The page was applied to the listing.
    Loaded(PageSummary),
    /// The request was dropped without touching the listing.
    Skipped(SkipReason),
}

/// Why a listing fetch was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another fetch is already running; concurrent requests are dropped,
    /// not queued.
    InFlight,
    /// `has_more` is false; there is nothing past the last page.
    Exhausted,
    /// The client was closed while the request was settling.
    Closed,
}

/// What applying a page did to the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSummary {
    /// Page number that was applied.
    pub page: u32,
    /// Products on the fetched page after category filtering.
    pub fetched: usize,
    /// Products actually added to the listing (after dedupe).
    pub appended: usize,
    /// Listing total after this page.
    pub total: u64,
    /// Whether the page was served from the cache.
    pub from_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_price_prefers_sale_price() {
        let mut product = Product {
            id: ProductId::new(1),
            slug: "tape".to_string(),
            name: "Tape".to_string(),
            price: "20.00".to_string(),
            regular_price: "20.00".to_string(),
            sale_price: None,
            stock_status: StockStatus::InStock,
            image: "/placeholder.svg".to_string(),
            description: String::new(),
            category: "music".to_string(),
        };
        assert_eq!(product.effective_price(), "20.00");
        assert!(!product.on_sale());

        product.sale_price = Some("15.00".to_string());
        assert_eq!(product.effective_price(), "15.00");
        assert!(product.on_sale());
    }

    #[test]
    fn sort_params_match_the_content_api() {
        assert_eq!(SortOption::Relevance.sort_param(), "published_at:desc");
        assert_eq!(SortOption::DateDesc.sort_param(), "published_at:desc");
        assert_eq!(SortOption::PriceAsc.sort_param(), "content.price:asc");
        assert_eq!(SortOption::PriceDesc.sort_param(), "content.price:desc");
    }
}
