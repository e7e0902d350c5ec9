//! Core types for the E-Shop PWA.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod notification;
pub mod price;
pub mod product;

pub use cart::{Cart, CartChange, CartLineItem};
pub use id::*;
pub use notification::{Notification, NotificationClick, PushPayload};
pub use price::{CurrencyCode, Price};
pub use product::Product;
