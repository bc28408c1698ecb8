//! Diplostore Core - shared types library.
//!
//! Domain types every Diplostore crate agrees on:
//! - `storefront` - the client-side storefront library (catalog, cart, checkout)
//! - `integration-tests` - end-to-end tests against mock servers
//!
//! # Architecture
//!
//! Only types and pure helpers live here: no I/O, no HTTP, no async.
//! Anything that talks to the outside world belongs in `storefront`.
//!
//! # Modules
//!
//! - [`types`] - typed IDs, money parsing, and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
