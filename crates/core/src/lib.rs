//! E-Shop Core - Shared types library.
//!
//! This crate provides common types used across all E-Shop components:
//! - `storefront` - Catalog, cart, and shell pages
//! - `offline` - Offline cache manager (cache-first fetch interception)
//! - `cli` - Command-line tools for cache and cart maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product IDs, prices, products, carts, and notification payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
