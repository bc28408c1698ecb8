//! Diplostore storefront client library.
//!
//! Client-side building blocks for the Diplostore shop: the product catalog
//! feed (pagination, caching, infinite scroll), the durable shopping cart,
//! and checkout initiation against the orders backend. A host UI drives
//! these components and renders their state; nothing here renders anything.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod categories;
pub mod config;
pub mod scroll;
pub mod services;
pub mod storage;
