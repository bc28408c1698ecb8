//! Product catalog client.
//!
//! [`CatalogClient`] pulls paginated product listings out of the content
//! CDN, normalizes them, and accumulates them into a listing the host can
//! render directly. Pages are cached per (sort, category, page); the whole
//! cache drops whenever sort or category changes, because those redefine
//! the key space. At most one listing fetch runs at a time; a second
//! request while one is in flight is dropped, not queued, matching the
//! event-loop model of the embedding UI.

mod api;
mod cache;
mod convert;
mod types;

pub use convert::{PLACEHOLDER_IMAGE, UNCATEGORIZED, UNNAMED_PRODUCT};
pub use types::{LoadPhase, PageFetch, PageSummary, Product, SkipReason, SortOption};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::categories::{self, CategoryFacet};
use crate::config::ContentConfig;

use api::ContentApi;
use cache::{CacheKey, CacheValue};
use convert::convert_story;

/// Errors that can occur when talking to the content API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The content API answered with an unexpected status code.
    #[error("content API returned {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// Rate limited by the CDN.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// No story exists for the slug.
    #[error("product not found: {0}")]
    NotFound(String),
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the product catalog.
///
/// Cheap to clone; every clone shares the same cache, listing state, and
/// in-flight guard.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    api: ContentApi,
    cache: Cache<CacheKey, CacheValue>,
    listing: Mutex<ListingState>,
    /// In-flight guard: set while a listing fetch is running.
    fetching: AtomicBool,
    /// Liveness flag, cleared by [`CatalogClient::close`].
    open: AtomicBool,
}

/// The accumulated listing, as the host renders it.
#[derive(Debug)]
struct ListingState {
    products: Vec<Product>,
    total: u64,
    current_page: u32,
    has_more: bool,
    phase: LoadPhase,
    last_error: Option<String>,
    sort: SortOption,
    category: Option<String>,
}

impl Default for ListingState {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            total: 0,
            current_page: 0,
            has_more: true,
            phase: LoadPhase::Idle,
            last_error: None,
            sort: SortOption::default(),
            category: None,
        }
    }
}

/// Clears the in-flight flag when a fetch settles, on every exit path.
struct FetchGuard<'a>(&'a AtomicBool);

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CatalogClient {
    const CACHE_CAPACITY: u64 = 1000;
    const CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

    /// Create a catalog client over the configured content API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ContentConfig) -> Result<Self, CatalogError> {
        let cache = Cache::builder()
            .max_capacity(Self::CACHE_CAPACITY)
            .time_to_live(Self::CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                api: ContentApi::new(config)?,
                cache,
                listing: Mutex::new(ListingState::default()),
                fetching: AtomicBool::new(false),
                open: AtomicBool::new(true),
            }),
        })
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Fetch one listing page and fold it into the accumulated listing.
    ///
    /// Page 1 replaces the listing wholesale; later pages append only
    /// products whose ids are not already present, so overlapping backend
    /// pages cannot duplicate entries. Returns [`PageFetch::Skipped`]
    /// without touching anything when another fetch is in flight, when
    /// `page > 1` and the listing is exhausted, or when the client has been
    /// closed.
    ///
    /// # Errors
    ///
    /// Network, status, and parse failures are recorded on the listing
    /// state and returned. The accumulated listing and the cache keep their
    /// last good contents, so the host can simply retry.
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, page: u32) -> Result<PageFetch, CatalogError> {
        if !self.inner.open.load(Ordering::Acquire) {
            return Ok(PageFetch::Skipped(SkipReason::Closed));
        }
        if self.inner.fetching.swap(true, Ordering::AcqRel) {
            warn!("dropping listing fetch: another one is in flight");
            return Ok(PageFetch::Skipped(SkipReason::InFlight));
        }
        let _guard = FetchGuard(&self.inner.fetching);

        let page = page.max(1);
        let (sort, category) = {
            let mut listing = self.lock_listing();
            if page > 1 && !listing.has_more {
                return Ok(PageFetch::Skipped(SkipReason::Exhausted));
            }
            listing.phase = if page == 1 {
                LoadPhase::Initial
            } else {
                LoadPhase::More
            };
            (listing.sort, listing.category.clone())
        };

        // The filter term doubles as the cache key component and the
        // server-side search term.
        let term = category.as_ref().map(|name| name.to_lowercase());
        let key = CacheKey::Listing {
            sort,
            category: term.clone(),
            page,
        };

        if let Some(CacheValue::Page { products, total }) = self.inner.cache.get(&key).await {
            debug!("cache hit for listing page");
            return Ok(self.apply_page(page, products, total, true));
        }

        let fetched = self
            .inner
            .api
            .list_stories(page, sort.sort_param(), term.as_deref())
            .await;

        let listing_page = match fetched {
            Ok(listing_page) => listing_page,
            Err(err) => {
                let mut listing = self.lock_listing();
                listing.phase = LoadPhase::Idle;
                listing.last_error = Some(err.to_string());
                return Err(err);
            }
        };

        let mut products: Vec<Product> = listing_page
            .stories
            .into_iter()
            .map(convert_story)
            .collect();
        if let Some(term) = &term {
            // The server-side search term match is fuzzy; keep only exact
            // category matches.
            products.retain(|product| product.category.to_lowercase() == *term);
        }

        let total = api::derive_total(
            listing_page.header_total,
            listing_page.body_total,
            products.len(),
        );

        self.inner
            .cache
            .insert(
                key,
                CacheValue::Page {
                    products: products.clone(),
                    total,
                },
            )
            .await;

        Ok(self.apply_page(page, products, total, false))
    }

    /// Fetch the page after the current one.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_page`].
    pub async fn fetch_next_page(&self) -> Result<PageFetch, CatalogError> {
        let next = self.lock_listing().current_page + 1;
        self.fetch_page(next).await
    }

    /// Fold a fetched page into the listing. Results that settle after
    /// [`Self::close`] are discarded.
    fn apply_page(
        &self,
        page: u32,
        products: Vec<Product>,
        total: u64,
        from_cache: bool,
    ) -> PageFetch {
        if !self.inner.open.load(Ordering::Acquire) {
            return PageFetch::Skipped(SkipReason::Closed);
        }

        let fetched = products.len();
        let mut listing = self.lock_listing();

        let appended = if page == 1 {
            listing.products = products;
            listing.products.len()
        } else {
            let mut appended = 0;
            for product in products {
                if !listing
                    .products
                    .iter()
                    .any(|existing| existing.id == product.id)
                {
                    listing.products.push(product);
                    appended += 1;
                }
            }
            appended
        };

        listing.total = total;
        listing.current_page = page;
        listing.has_more = (listing.products.len() as u64) < total && fetched > 0;
        listing.phase = LoadPhase::Idle;
        listing.last_error = None;

        debug!(
            page,
            fetched,
            appended,
            total,
            from_cache,
            has_more = listing.has_more,
            "applied listing page"
        );

        PageFetch::Loaded(PageSummary {
            page,
            fetched,
            appended,
            total,
            from_cache,
        })
    }

    // =========================================================================
    // Dimensions
    // =========================================================================

    /// Change the sort order. Drops every cached page and resets the
    /// accumulated listing; the next `fetch_page(1)` rebuilds it.
    pub async fn set_sort(&self, sort: SortOption) {
        self.lock_listing().sort = sort;
        self.reset_listing().await;
    }

    /// Set or clear the category filter (matched case-insensitively).
    /// Drops every cached page and resets the accumulated listing.
    pub async fn set_category(&self, category: Option<String>) {
        self.lock_listing().category = category;
        self.reset_listing().await;
    }

    async fn reset_listing(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;

        let mut listing = self.lock_listing();
        listing.products.clear();
        listing.total = 0;
        listing.current_page = 0;
        listing.has_more = true;
        listing.phase = LoadPhase::Idle;
        listing.last_error = None;
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Fetch the unfiltered first page once and aggregate category facets
    /// from it.
    ///
    /// Bypasses the page cache and never touches the accumulated listing;
    /// hosts call this at mount to populate the sidebar, independent of
    /// pagination state.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing request fails.
    #[instrument(skip(self))]
    pub async fn load_categories(&self) -> Result<Vec<CategoryFacet>, CatalogError> {
        let page = self
            .inner
            .api
            .list_stories(1, SortOption::default().sort_param(), None)
            .await?;

        let products: Vec<Product> = page.stories.into_iter().map(convert_story).collect();
        Ok(categories::aggregate(&products))
    }

    // =========================================================================
    // Product detail
    // =========================================================================

    /// Get a product by its slug, cache-through.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when no story exists for the
    /// slug; transport and parse failures otherwise.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product(&self, slug: &str) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(slug.to_string());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("cache hit for product");
            return Ok(*product);
        }

        let story = self.inner.api.get_story(slug).await?;
        let product = convert_story(story);

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Products accumulated so far, in render order.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.lock_listing().products.clone()
    }

    /// Listing total reported by the content API.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.lock_listing().total
    }

    /// Whether pages remain past the current one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.lock_listing().has_more
    }

    /// Last applied page number (0 before the first fetch).
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.lock_listing().current_page
    }

    /// Current load phase, for skeleton vs spinner rendering.
    #[must_use]
    pub fn load_phase(&self) -> LoadPhase {
        self.lock_listing().phase
    }

    /// Whether a listing fetch is in flight right now.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.fetching.load(Ordering::Acquire)
    }

    /// Message from the last failed fetch, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.lock_listing().last_error.clone()
    }

    /// Active sort order.
    #[must_use]
    pub fn sort(&self) -> SortOption {
        self.lock_listing().sort
    }

    /// Active category filter, as set by the host.
    #[must_use]
    pub fn category(&self) -> Option<String> {
        self.lock_listing().category.clone()
    }

    /// Shut the client down. Fetches that settle afterwards are discarded
    /// without mutating state; new fetches are skipped.
    pub fn close(&self) {
        self.inner.open.store(false, Ordering::Release);
    }

    fn lock_listing(&self) -> MutexGuard<'_, ListingState> {
        self.inner
            .listing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
