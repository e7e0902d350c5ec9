//! Offline cache commands.
//!
//! # Usage
//!
//! ```bash
//! # Fetch the app shell into the current bucket
//! eshop-cli cache warm --origin http://127.0.0.1:3000
//!
//! # Drop buckets left behind by older versions
//! eshop-cli cache activate --cache-version ecommerce-pwa-cache-v2
//!
//! # Show what is stored
//! eshop-cli cache list --entries
//! ```
//!
//! # Environment Variables
//!
//! - `OFFLINE_CACHE_DIR` - Cache root directory (default: cache)
//! - `OFFLINE_CACHE_VERSION` - Current bucket name
//! - `OFFLINE_ORIGIN` - Storefront origin (`warm` only)
//! - `OFFLINE_ALLOWED_HOSTS` - Extra hosts treated as the app's own (`warm` only)
//!
//! These are the same directory and bucket the `eshop-offline` proxy uses, so
//! a warmed cache is picked up by the next proxy start.

use std::path::Path;

use eshop_offline::storage::delete_stale;
use eshop_offline::{
    CacheManager, CacheSettings, CacheStorage, DiskCacheStorage, HttpNetwork, InstallError,
    Network, OriginPolicy, StorageError,
};
use thiserror::Error;
use url::Url;

/// Errors that can occur during cache commands.
#[derive(Debug, Error)]
pub enum CacheCommandError {
    /// The origin could not be turned into shell URLs.
    #[error("Invalid origin: {0}")]
    InvalidOrigin(#[from] url::ParseError),

    /// Reading or writing buckets failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The shell could not be fetched in full.
    #[error("Install failed: {0}")]
    Install(#[from] InstallError),
}

/// Open the disk cache under `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub async fn open(dir: &Path) -> Result<DiskCacheStorage, CacheCommandError> {
    tracing::debug!(dir = %dir.display(), "Opening cache directory");
    Ok(DiskCacheStorage::open_root(dir).await?)
}

/// A cache manager that fetches over HTTP.
///
/// # Errors
///
/// Returns an error if the shell URLs cannot be resolved against `origin`.
pub fn http_manager<S: CacheStorage>(
    storage: S,
    origin: Url,
    allowed_hosts: Vec<String>,
    version: &str,
) -> Result<CacheManager<S, HttpNetwork>, CacheCommandError> {
    let network = HttpNetwork::new(OriginPolicy::new(origin.clone(), allowed_hosts.clone()));
    let settings = CacheSettings::new(origin, allowed_hosts)?.with_version(version);
    Ok(CacheManager::new(storage, network, settings))
}

/// Fetch every shell asset into the current bucket.
///
/// Returns the number of entries in the bucket afterwards. All or nothing:
/// if one asset fails, nothing new is stored.
///
/// # Errors
///
/// Returns an error if any asset cannot be fetched or stored.
pub async fn warm<S: CacheStorage, N: Network>(
    manager: &CacheManager<S, N>,
) -> Result<usize, CacheCommandError> {
    let settings = manager.settings();
    tracing::info!(
        cache = %settings.version,
        assets = settings.manifest.len(),
        "Warming cache..."
    );

    manager.install().await?;

    let stored = manager.storage().entries(&settings.version).await?.len();
    tracing::info!(cache = %settings.version, entries = stored, "Cache warmed");
    Ok(stored)
}

/// Delete every bucket except `current`.
///
/// # Errors
///
/// Returns an error if listing or deleting buckets fails.
pub async fn activate<S: CacheStorage>(
    storage: &S,
    current: &str,
) -> Result<Vec<String>, CacheCommandError> {
    let deleted = delete_stale(storage, current).await?;
    if deleted.is_empty() {
        tracing::info!(cache = current, "No stale caches");
    } else {
        tracing::info!(cache = current, deleted = ?deleted, "Stale caches deleted");
    }
    Ok(deleted)
}

/// Log every bucket, marking the current one.
///
/// Returns the bucket names.
///
/// # Errors
///
/// Returns an error if the buckets cannot be read.
pub async fn list<S: CacheStorage>(
    storage: &S,
    current: &str,
    with_entries: bool,
) -> Result<Vec<String>, CacheCommandError> {
    let names = storage.keys().await?;
    if names.is_empty() {
        tracing::info!("No caches");
    }

    for name in &names {
        let entries = storage.entries(name).await?;
        tracing::info!(
            cache = %name,
            current = name == current,
            entries = entries.len(),
            "Cache"
        );
        if with_entries {
            for key in entries {
                tracing::info!(cache = %name, "  {key}");
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use eshop_offline::MemoryCacheStorage;
    use eshop_offline::manifest::ShellManifest;
    use eshop_offline::testing::ScriptedNetwork;

    use super::*;

    const ORIGIN: &str = "http://127.0.0.1:3000";

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    fn manager<S: CacheStorage>(
        storage: S,
        version: &str,
    ) -> (CacheManager<S, ScriptedNetwork>, ScriptedNetwork) {
        let settings = CacheSettings::new(Url::parse(ORIGIN).unwrap(), vec![])
            .unwrap()
            .with_version(version)
            .with_manifest(ShellManifest::new(vec![url("/"), url("/index.html")]));
        let network = ScriptedNetwork::new(settings.policy.clone());
        network.ok(&url("/"), "<html>shell</html>");
        (CacheManager::new(storage, network.clone(), settings), network)
    }

    #[tokio::test]
    async fn test_warm_stores_shell() {
        let (manager, network) = manager(MemoryCacheStorage::new(), "v1");
        network.ok(&url("/index.html"), "<html>shell</html>");

        assert_eq!(warm(&manager).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_warm_fails_when_asset_missing() {
        let storage = MemoryCacheStorage::new();
        let (manager, _) = manager(storage.clone(), "v1");

        assert!(matches!(
            warm(&manager).await,
            Err(CacheCommandError::Install(_))
        ));
        assert!(storage.entries("v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_and_list_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        for version in ["ecommerce-pwa-cache-v0", "ecommerce-pwa-cache-v1"] {
            let (manager, network) = manager(open(dir.path()).await.unwrap(), version);
            network.ok(&url("/index.html"), "<html>shell</html>");
            warm(&manager).await.unwrap();
        }

        let storage = open(dir.path()).await.unwrap();
        let names = list(&storage, "ecommerce-pwa-cache-v1", true).await.unwrap();
        assert_eq!(names, vec!["ecommerce-pwa-cache-v0", "ecommerce-pwa-cache-v1"]);

        let deleted = activate(&storage, "ecommerce-pwa-cache-v1").await.unwrap();
        assert_eq!(deleted, vec!["ecommerce-pwa-cache-v0"]);

        let reopened = open(dir.path()).await.unwrap();
        assert_eq!(reopened.keys().await.unwrap(), vec!["ecommerce-pwa-cache-v1"]);
        assert_eq!(reopened.entries("ecommerce-pwa-cache-v1").await.unwrap().len(), 2);
        assert!(
            activate(&reopened, "ecommerce-pwa-cache-v1")
                .await
                .unwrap()
                .is_empty()
        );
    }
}
