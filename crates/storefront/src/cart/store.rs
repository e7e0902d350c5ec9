//! The cart store.

use eshop_core::{Cart, CartChange, Price, ProductId};
use tokio::sync::watch;
use tracing::instrument;

use super::storage::CartStorage;
use crate::catalog::Catalog;

/// Owns the cart, persists it, and tells subscribers when it changes.
///
/// Every mutation follows the same order: change the in-memory cart,
/// publish the snapshot, then write it to storage. A failed write is logged
/// and otherwise ignored; the in-memory cart stays authoritative.
pub struct CartStore<S> {
    cart: Cart,
    catalog: Catalog,
    storage: S,
    snapshots: watch::Sender<Cart>,
}

impl<S: CartStorage> CartStore<S> {
    /// Restore the cart from `storage`.
    ///
    /// A missing snapshot gives an empty cart, and so does one that cannot
    /// be read or parsed.
    pub async fn load(catalog: Catalog, storage: S) -> Self {
        let cart = match storage.load().await {
            Ok(Some(cart)) => cart,
            Ok(None) => Cart::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable cart snapshot");
                Cart::new()
            }
        };
        tracing::debug!(lines = cart.items().len(), "Cart loaded");

        let (snapshots, _) = watch::channel(cart.clone());
        Self {
            cart,
            catalog,
            storage,
            snapshots,
        }
    }

    /// Current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Sum of price times quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.cart.total()
    }

    /// Number of units in the cart.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.cart.count()
    }

    /// Receive a snapshot after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.snapshots.subscribe()
    }

    /// Add one unit of a catalog product. Unknown ids are ignored.
    #[instrument(skip(self))]
    pub async fn add(&mut self, id: ProductId) -> Option<CartChange> {
        let Some(product) = self.catalog.get(id) else {
            tracing::debug!("Ignoring unknown product");
            return None;
        };
        let change = self.cart.add(product);
        self.commit().await;
        Some(change)
    }

    /// Remove one unit, or the whole line when `remove_all` is set.
    /// Products not in the cart are ignored.
    #[instrument(skip(self))]
    pub async fn remove(&mut self, id: ProductId, remove_all: bool) -> Option<CartChange> {
        let change = self.cart.remove(id, remove_all)?;
        self.commit().await;
        Some(change)
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) {
        self.cart.clear();
        self.commit().await;
    }

    async fn commit(&self) {
        self.snapshots.send_replace(self.cart.clone());
        if let Err(e) = self.storage.save(&self.cart).await {
            tracing::warn!(error = %e, "Failed to persist cart");
        }
    }
}
