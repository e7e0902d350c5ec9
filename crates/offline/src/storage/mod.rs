//! Named, versioned cache buckets.
//!
//! A [`CacheStorage`] holds any number of buckets, each a map from
//! [`RequestKey`] to [`Response`]. Entries never expire: the only
//! invalidation is deleting a whole bucket when the version tag changes.
//!
//! # Backends
//!
//! - [`MemoryCacheStorage`] - `moka` caches, one per bucket (tests, ephemeral proxies)
//! - [`DiskCacheStorage`] - one directory per bucket, survives restarts

mod disk;
mod memory;

use std::future::Future;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

use crate::error::StorageError;
use crate::request::{RequestKey, Response};

/// Storage for cache buckets.
///
/// Bucket names are returned by [`keys`](Self::keys) in creation order.
pub trait CacheStorage: Send + Sync + 'static {
    /// Open a bucket, creating it if it does not exist.
    fn open(&self, name: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Whether a bucket exists.
    fn has(&self, name: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Delete a bucket and every entry in it. Returns `false` if it did not exist.
    fn delete(&self, name: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Names of all buckets.
    fn keys(&self) -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;

    /// Store a response, replacing any previous entry for `key`.
    ///
    /// The bucket must have been opened.
    fn put(
        &self,
        bucket: &str,
        key: RequestKey,
        response: Response,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Look up a response in one bucket. A missing bucket is a miss.
    fn get(
        &self,
        bucket: &str,
        key: &RequestKey,
    ) -> impl Future<Output = Result<Option<Response>, StorageError>> + Send;

    /// Keys stored in a bucket, sorted.
    fn entries(
        &self,
        bucket: &str,
    ) -> impl Future<Output = Result<Vec<RequestKey>, StorageError>> + Send;

    /// Store several responses.
    fn put_all(
        &self,
        bucket: &str,
        entries: Vec<(RequestKey, Response)>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        async move {
            for (key, response) in entries {
                self.put(bucket, key, response).await?;
            }
            Ok(())
        }
    }

    /// Look up a response in every bucket, oldest bucket first.
    fn match_any(
        &self,
        key: &RequestKey,
    ) -> impl Future<Output = Result<Option<Response>, StorageError>> + Send {
        async move {
            for name in self.keys().await? {
                if let Some(response) = self.get(&name, key).await? {
                    return Ok(Some(response));
                }
            }
            Ok(None)
        }
    }
}

/// Delete every bucket whose name differs from `current`.
///
/// Returns the names actually deleted, in bucket order.
///
/// # Errors
///
/// Returns an error if listing or deleting buckets fails.
pub async fn delete_stale<S: CacheStorage>(
    storage: &S,
    current: &str,
) -> Result<Vec<String>, StorageError> {
    let mut deleted = Vec::new();
    for name in storage.keys().await? {
        if name != current && storage.delete(&name).await? {
            tracing::info!(cache = %name, "Deleted old cache");
            deleted.push(name);
        }
    }
    Ok(deleted)
}

/// Reject bucket names that are empty or could address outside a directory.
pub(crate) fn validate_bucket_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidBucketName(name.to_string()));
    }
    Ok(())
}
