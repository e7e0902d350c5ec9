//! Shopping cart line items and pure cart arithmetic.
//!
//! The [`Cart`] owns the invariants: every entry has `quantity >= 1` and no
//! product id appears twice. Persistence and change notification live in the
//! storefront's cart store; this module only mutates in-memory state and
//! reports what changed.

use serde::{Deserialize, Serialize};
use url::Url;

use super::id::ProductId;
use super::price::{CurrencyCode, Price};
use super::product::Product;

/// A product in the cart together with how many units were added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: Url,
    pub quantity: u32,
}

impl CartLineItem {
    /// Create a line item holding a single unit of `product`.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            quantity: 1,
        }
    }

    /// Price of this line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// What a cart mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended with quantity 1.
    Added { id: ProductId, name: String },
    /// An existing line's quantity went up.
    Incremented {
        id: ProductId,
        name: String,
        quantity: u32,
    },
    /// An existing line's quantity went down but is still at least 1.
    Decremented {
        id: ProductId,
        name: String,
        quantity: u32,
    },
    /// The line was deleted.
    Removed {
        id: ProductId,
        name: String,
        all: bool,
    },
}

impl CartChange {
    /// Product the change applied to.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        match self {
            Self::Added { id, .. }
            | Self::Incremented { id, .. }
            | Self::Decremented { id, .. }
            | Self::Removed { id, .. } => *id,
        }
    }

    /// Whether the change put more units into the cart.
    #[must_use]
    pub const fn is_addition(&self) -> bool {
        matches!(self, Self::Added { .. } | Self::Incremented { .. })
    }
}

/// Ordered list of cart lines, keyed by product id.
///
/// Serializes as a plain JSON array of [`CartLineItem`]. Deserializing goes
/// through [`Cart::from_items`], so a snapshot written by an older build
/// cannot smuggle in zero quantities or duplicate ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLineItem>", into = "Vec<CartLineItem>")]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from raw line items, restoring the invariants.
    ///
    /// Lines with quantity 0 are dropped and duplicate ids are merged into
    /// the first occurrence.
    #[must_use]
    pub fn from_items(items: Vec<CartLineItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            if item.quantity == 0 {
                continue;
            }
            match cart.items.iter_mut().find(|line| line.id == item.id) {
                Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
                None => cart.items.push(item),
            }
        }
        cart
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|line| line.id == id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit of `product`.
    ///
    /// Increments the existing line, or appends a new line with quantity 1.
    pub fn add(&mut self, product: &Product) -> CartChange {
        if let Some(line) = self.items.iter_mut().find(|line| line.id == product.id) {
            line.quantity = line.quantity.saturating_add(1);
            return CartChange::Incremented {
                id: line.id,
                name: line.name.clone(),
                quantity: line.quantity,
            };
        }

        self.items.push(CartLineItem::from_product(product));
        CartChange::Added {
            id: product.id,
            name: product.name.clone(),
        }
    }

    /// Remove one unit of a product, or the whole line when `remove_all` is set.
    ///
    /// Returns `None` when the product is not in the cart. A line whose
    /// quantity would reach zero is deleted.
    pub fn remove(&mut self, id: ProductId, remove_all: bool) -> Option<CartChange> {
        let index = self.items.iter().position(|line| line.id == id)?;
        let line = self.items.get_mut(index)?;

        if remove_all || line.quantity <= 1 {
            let line = self.items.remove(index);
            return Some(CartChange::Removed {
                id: line.id,
                name: line.name,
                all: remove_all,
            });
        }

        line.quantity -= 1;
        Some(CartChange::Decremented {
            id: line.id,
            name: line.name.clone(),
            quantity: line.quantity,
        })
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        if self.items.is_empty() {
            return Price::zero(CurrencyCode::default());
        }
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |sum, line| sum.saturating_add(line.quantity))
    }
}

impl From<Vec<CartLineItem>> for Cart {
    fn from(items: Vec<CartLineItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<Cart> for Vec<CartLineItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}
