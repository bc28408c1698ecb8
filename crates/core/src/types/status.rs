//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Product stock status.
///
/// The content API sends this as a free-form string; anything that is not
/// explicitly `outofstock` counts as in stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
}

impl StockStatus {
    /// Parse a wire value, defaulting to `InStock` for anything unknown.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("outofstock") {
            Self::OutOfStock
        } else {
            Self::InStock
        }
    }

    /// Whether the product can be added to a cart.
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::InStock)
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InStock => write!(f, "instock"),
            Self::OutOfStock => write!(f, "outofstock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_values_default_to_in_stock() {
        assert_eq!(StockStatus::parse("instock"), StockStatus::InStock);
        assert_eq!(StockStatus::parse("backorder"), StockStatus::InStock);
        assert_eq!(StockStatus::parse(""), StockStatus::InStock);
    }

    #[test]
    fn out_of_stock_is_recognized() {
        assert_eq!(StockStatus::parse("outofstock"), StockStatus::OutOfStock);
        assert_eq!(StockStatus::parse("OutOfStock"), StockStatus::OutOfStock);
        assert!(!StockStatus::OutOfStock.is_available());
    }
}
