//! E-Shop Storefront library.
//!
//! The storefront renders the shell document, the product grid, and the
//! cart, and owns the single persisted cart. It knows nothing about the
//! offline cache; every request it serves may or may not have passed
//! through the offline worker first.
//!
//! # Modules
//!
//! - [`catalog`] - The static product list
//! - [`cart`] - Cart store and snapshot storage
//! - [`views`] - Preformatted display data for templates
//! - [`notifications`] - Toasts and the notification permission flow
//! - [`navigation`] - Section switching
//! - [`routes`] - HTTP handlers and the application router

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod navigation;
pub mod notifications;
pub mod routes;
pub mod state;
pub mod views;
