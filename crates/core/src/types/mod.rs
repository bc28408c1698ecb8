//! Core types for Diplostore.
//!
//! Typed wrappers for the domain values that cross crate boundaries.

pub mod id;
pub mod price;
pub mod status;

pub use id::*;
pub use price::{CurrencyCode, format_amount, parse_amount};
pub use status::*;
