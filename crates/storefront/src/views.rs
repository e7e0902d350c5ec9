//! Display data for templates.
//!
//! Views are plain structs of preformatted strings, built from the catalog or
//! a cart snapshot. Templates never do arithmetic.

use eshop_core::{Cart, CartLineItem, Product};
use serde::Serialize;

use crate::navigation::{Navigation, Section};

/// Fixed blurb shown under every product name.
pub const PRODUCT_TAGLINE: &str = "High-quality, durable, and stylish.";

/// One card in the product grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCardView {
    pub id: i32,
    pub name: String,
    pub tagline: &'static str,
    pub price: String,
    pub image: String,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            tagline: PRODUCT_TAGLINE,
            price: product.price.display(),
            image: product.image.to_string(),
        }
    }
}

/// One header navigation link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavLinkView {
    pub id: &'static str,
    pub label: &'static str,
    pub active: bool,
}

impl NavLinkView {
    /// Links for every section, in header order.
    #[must_use]
    pub fn all(nav: &Navigation) -> Vec<Self> {
        Section::ALL
            .into_iter()
            .map(|section| Self {
                id: section.id(),
                label: section.label(),
                active: nav.is_active(section),
            })
            .collect()
    }
}

/// One row of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemView {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    /// `$79.99 x 2`
    pub summary: String,
}

impl From<&CartLineItem> for CartItemView {
    fn from(line: &CartLineItem) -> Self {
        Self {
            id: line.id.as_i32(),
            name: line.name.clone(),
            image: line.image.to_string(),
            quantity: line.quantity,
            summary: format!("{} x {}", line.price.display(), line.quantity),
        }
    }
}

/// The cart section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub count: u32,
    /// Two decimals, no currency symbol (`159.98`).
    pub total: String,
}

impl CartView {
    /// Whether to show the empty-cart message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().iter().map(CartItemView::from).collect(),
            count: cart.count(),
            total: cart.total().amount_display(),
        }
    }
}
