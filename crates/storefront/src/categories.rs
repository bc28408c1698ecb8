//! Category facet aggregation for the catalog sidebar.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Product;

/// A category with its product count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFacet {
    /// Display name, first letter capitalized.
    pub name: String,
    /// Number of products in the category.
    pub count: usize,
}

/// Group products by category (case-insensitive) and count them.
///
/// Facets come back ordered by descending count; ties keep the order in
/// which the category was first seen.
#[must_use]
pub fn aggregate(products: &[Product]) -> Vec<CategoryFacet> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for product in products {
        let key = product.category.to_lowercase();
        if !counts.contains_key(&key) {
            order.push(key.clone());
        }
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut facets: Vec<CategoryFacet> = order
        .into_iter()
        .map(|key| {
            let count = counts.get(&key).copied().unwrap_or(0);
            CategoryFacet {
                name: capitalize(&key),
                count,
            }
        })
        .collect();
    facets.sort_by(|a, b| b.count.cmp(&a.count));
    facets
}

/// Uppercase the first letter of a lowercased category name.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}
