//! Durable cart snapshots.
//!
//! The snapshot is the JSON array of line items, written whole on every
//! change ("last write wins").

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use eshop_core::Cart;
use thiserror::Error;

/// Storage key of the cart snapshot.
pub const CART_STORAGE_KEY: &str = "ecommerce_cart";

/// Cart snapshot could not be read or written.
#[derive(Debug, Error)]
pub enum CartStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid cart snapshot: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Where cart snapshots are kept.
pub trait CartStorage: Send + Sync + 'static {
    /// Read the last saved snapshot. `Ok(None)` when nothing was saved yet.
    fn load(&self) -> impl Future<Output = Result<Option<Cart>, CartStorageError>> + Send;

    /// Replace the saved snapshot.
    fn save(&self, cart: &Cart) -> impl Future<Output = Result<(), CartStorageError>> + Send;
}

/// Snapshot kept in `<dir>/ecommerce_cart.json`.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    path: PathBuf,
}

impl FileCartStorage {
    /// Keep the snapshot under `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{CART_STORAGE_KEY}.json")),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for FileCartStorage {
    async fn load(&self) -> Result<Option<Cart>, CartStorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartStorageError> {
        let json = serde_json::to_vec(cart)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Snapshot kept in memory as raw JSON.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    raw: Arc<Mutex<Option<String>>>,
}

impl MemoryCartStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a raw snapshot, valid or not.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    /// The raw snapshot last saved.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.raw
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CartStorage for MemoryCartStorage {
    async fn load(&self) -> Result<Option<Cart>, CartStorageError> {
        self.raw()
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(CartStorageError::from)
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartStorageError> {
        let json = serde_json::to_string(cart)?;
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
        Ok(())
    }
}

/// The storage backends the storefront can run with.
#[derive(Debug, Clone)]
pub enum CartBackend {
    File(FileCartStorage),
    Memory(MemoryCartStorage),
}

impl From<FileCartStorage> for CartBackend {
    fn from(storage: FileCartStorage) -> Self {
        Self::File(storage)
    }
}

impl From<MemoryCartStorage> for CartBackend {
    fn from(storage: MemoryCartStorage) -> Self {
        Self::Memory(storage)
    }
}

impl CartStorage for CartBackend {
    async fn load(&self) -> Result<Option<Cart>, CartStorageError> {
        match self {
            Self::File(storage) => storage.load().await,
            Self::Memory(storage) => storage.load().await,
        }
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartStorageError> {
        match self {
            Self::File(storage) => storage.save(cart).await,
            Self::Memory(storage) => storage.save(cart).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use eshop_core::{Price, Product, ProductId};
    use url::Url;

    use super::*;

    fn cart() -> Cart {
        let mut cart = Cart::new();
        let product = Product::new(
            ProductId::new(1),
            "Wireless Headphones",
            Price::from_cents(7999),
            Url::parse("https://placehold.co/300x200?text=Headphones").unwrap(),
        );
        cart.add(&product);
        cart.add(&product);
        cart
    }

    #[tokio::test]
    async fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileCartStorage::in_dir(dir.path().join("nested"));
        assert!(storage.load().await.unwrap().is_none());

        storage.save(&cart()).await.unwrap();
        assert!(storage.path().ends_with("ecommerce_cart.json"));
        assert_eq!(storage.load().await.unwrap(), Some(cart()));
    }

    #[tokio::test]
    async fn test_file_storage_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileCartStorage::in_dir(dir.path());
        tokio::fs::write(storage.path(), "{not json").await.unwrap();
        assert!(matches!(
            storage.load().await,
            Err(CartStorageError::Serde(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_storage_snapshot_is_json_array() {
        let storage = MemoryCartStorage::new();
        storage.save(&cart()).await.unwrap();

        let raw: serde_json::Value = serde_json::from_str(&storage.raw().unwrap()).unwrap();
        let lines = raw.as_array().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["quantity"], 2);
        assert_eq!(lines[0]["name"], "Wireless Headphones");
    }
}
