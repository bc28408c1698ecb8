//! Money parsing and formatting using decimal arithmetic.
//!
//! Product prices arrive from the content API as display strings ("12.50",
//! "$12.50", "1,200.00"). All arithmetic goes through [`parse_amount`] so
//! every component agrees on how those strings become numbers.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parse a display price string into a `Decimal`.
///
/// Strips everything that is not a digit, a decimal point, or a minus sign
/// before parsing, so currency symbols and thousands separators are
/// tolerated. Unparseable input yields `Decimal::ZERO` rather than an error;
/// a malformed price on one cart line must not poison the whole total.
#[must_use]
pub fn parse_amount(value: &str) -> Decimal {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    Decimal::from_str(&cleaned).unwrap_or_default()
}

/// Format an amount for display, e.g. `$19.99`.
#[must_use]
pub fn format_amount(amount: Decimal, currency: CurrencyCode) -> String {
    format!("{}{amount:.2}", currency.symbol())
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::USD => write!(f, "USD"),
            Self::EUR => write!(f, "EUR"),
            Self::GBP => write!(f, "GBP"),
            Self::CAD => write!(f, "CAD"),
            Self::AUD => write!(f, "AUD"),
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(format!("invalid currency code: {s}")),
        }
    }
}
