//! Wire-to-domain conversion for catalog stories.
//!
//! Every default lives here so the rest of the crate (and the host UI)
//! never sees a hole: a product always has a name, a price, an image URL,
//! and a category.

use diplostore_core::{ProductId, StockStatus};

use super::api::{StoryDto, WireAmount};
use super::types::Product;

/// Image URL used when the CMS entry has none.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg?height=200&width=200";

/// Category assigned to products without one.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Display name for products missing one.
pub const UNNAMED_PRODUCT: &str = "Unnamed product";

/// Normalize a CMS story into a [`Product`].
pub(super) fn convert_story(story: StoryDto) -> Product {
    let content = story.content;

    let price = display_amount(content.price).unwrap_or_else(|| "0".to_string());
    let regular_price = display_amount(content.regular_price).unwrap_or_else(|| price.clone());
    let sale_price = display_amount(content.sale_price);

    Product {
        id: ProductId::new(story.id),
        slug: story.slug,
        name: non_empty(content.name).unwrap_or_else(|| UNNAMED_PRODUCT.to_string()),
        price,
        regular_price,
        sale_price,
        stock_status: content
            .stock_status
            .as_deref()
            .map_or(StockStatus::InStock, StockStatus::parse),
        image: content
            .image
            .and_then(|image| non_empty(image.filename))
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        description: content.description.unwrap_or_default(),
        category: non_empty(content.category).unwrap_or_else(|| UNCATEGORIZED.to_string()),
    }
}

/// Display string for a wire amount; an empty value counts as absent.
fn display_amount(amount: Option<WireAmount>) -> Option<String> {
    amount
        .map(WireAmount::into_display)
        .filter(|text| !text.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}
