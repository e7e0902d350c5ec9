//! Application state shared across handlers.

use std::sync::Arc;

use eshop_core::Cart;
use tokio::sync::{Mutex, MutexGuard, watch};

use crate::cart::{CartBackend, CartStore};
use crate::catalog::Catalog;
use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The cart store sits behind an
/// async mutex so cart mutations are applied one at a time; read-only views
/// render from the store's snapshot channel without taking the lock.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Catalog,
    cart: Mutex<CartStore<CartBackend>>,
    snapshots: watch::Receiver<Cart>,
}

impl AppState {
    /// Create a new application state, restoring the cart from `storage`.
    pub async fn new(
        config: StorefrontConfig,
        catalog: Catalog,
        storage: impl Into<CartBackend>,
    ) -> Self {
        let cart = CartStore::load(catalog.clone(), storage.into()).await;
        let snapshots = cart.subscribe();
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                cart: Mutex::new(cart),
                snapshots,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The products on offer.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Latest published cart.
    #[must_use]
    pub fn cart_snapshot(&self) -> Cart {
        self.inner.snapshots.borrow().clone()
    }

    /// Lock the cart store.
    pub async fn cart(&self) -> MutexGuard<'_, CartStore<CartBackend>> {
        self.inner.cart.lock().await
    }
}
