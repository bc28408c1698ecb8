//! Cache types for content API responses.

use super::types::{Product, SortOption};

/// Cache key for listing pages and product details.
///
/// Listing keys carry the full (sort, category, page) dimension even
/// though the whole cache is dropped when sort or category changes; the
/// key space stays unambiguous if that invalidation rule ever loosens.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub(super) enum CacheKey {
    Listing {
        sort: SortOption,
        /// Lowercased category filter; `None` for the unfiltered listing.
        category: Option<String>,
        page: u32,
    },
    Product(String),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub(super) enum CacheValue {
    /// A normalized, category-filtered listing page and the listing total
    /// derived for it.
    Page { products: Vec<Product>, total: u64 },
    Product(Box<Product>),
}
