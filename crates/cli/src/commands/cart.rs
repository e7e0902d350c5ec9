//! Persisted cart commands.
//!
//! # Usage
//!
//! ```bash
//! eshop-cli cart show --data-dir data
//! eshop-cli cart clear
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATA_DIR` - Directory holding `ecommerce_cart.json` (default: data)
//!
//! Stop the storefront before clearing: it keeps the cart in memory and
//! overwrites the snapshot on its next change.

use std::path::Path;

use eshop_storefront::cart::{CartStorage, CartStore, FileCartStorage};
use eshop_storefront::catalog::Catalog;
use eshop_storefront::views::CartView;

/// Load the cart the storefront would restore on startup.
async fn load(data_dir: &Path) -> Result<CartStore<FileCartStorage>, url::ParseError> {
    let storage = FileCartStorage::in_dir(data_dir);
    tracing::debug!(path = %storage.path().display(), "Reading cart snapshot");
    Ok(CartStore::load(Catalog::demo()?, storage).await)
}

/// Log every cart line, the unit count, and the total.
///
/// # Errors
///
/// Returns an error if the catalog cannot be built.
pub async fn show(data_dir: &Path) -> Result<CartView, url::ParseError> {
    let store = load(data_dir).await?;
    let view = CartView::from(store.cart());

    if view.is_empty() {
        tracing::info!("Your cart is empty.");
    }
    for item in &view.items {
        tracing::info!(id = item.id, "{}: {}", item.name, item.summary);
    }
    tracing::info!(count = view.count, "Total: ${}", view.total);
    Ok(view)
}

/// Empty the cart and write the empty snapshot.
///
/// # Errors
///
/// Returns an error if the empty snapshot cannot be written.
pub async fn clear(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = load(data_dir).await?;
    let removed = store.count();
    store.clear().await;

    // The store only logs save failures; check the file really is empty now.
    let storage = FileCartStorage::in_dir(data_dir);
    match storage.load().await {
        Ok(Some(cart)) if cart.is_empty() => {
            tracing::info!(removed, "Cart cleared");
            Ok(())
        }
        Ok(_) => Err("cart snapshot was not written".into()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use eshop_core::ProductId;
    use eshop_storefront::cart::CART_STORAGE_KEY;

    use super::*;

    #[tokio::test]
    async fn test_show_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::demo().unwrap();
        let mut store = CartStore::load(catalog, FileCartStorage::in_dir(dir.path())).await;
        store.add(ProductId::new(1)).await.unwrap();
        store.add(ProductId::new(1)).await.unwrap();
        store.add(ProductId::new(3)).await.unwrap();

        let view = show(dir.path()).await.unwrap();
        assert_eq!(view.count, 3);
        assert_eq!(view.total, "209.97");
        assert_eq!(view.items[0].summary, "$79.99 x 2");

        clear(dir.path()).await.unwrap();
        let raw = std::fs::read_to_string(dir.path().join(format!("{CART_STORAGE_KEY}.json")))
            .unwrap();
        assert_eq!(raw, "[]");
        assert!(show(dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_show_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let view = show(dir.path()).await.unwrap();
        assert!(view.is_empty());
        assert_eq!(view.total, "0.00");
    }
}
