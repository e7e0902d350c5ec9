//! In-memory cache buckets backed by `moka`.

use std::sync::Arc;

use moka::future::Cache;
use tokio::sync::RwLock;

use super::{CacheStorage, validate_bucket_name};
use crate::error::StorageError;
use crate::request::{RequestKey, Response};

type Bucket = Cache<RequestKey, Response>;

/// Buckets held in process memory.
///
/// Each bucket is an unbounded `moka` cache with no time-to-live, so entries
/// only disappear when their bucket is deleted. Cloning shares the buckets.
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    buckets: Arc<RwLock<Vec<(String, Bucket)>>>,
}

impl MemoryCacheStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn bucket(&self, name: &str) -> Option<Bucket> {
        self.buckets
            .read()
            .await
            .iter()
            .find(|(bucket, _)| bucket == name)
            .map(|(_, cache)| cache.clone())
    }
}

impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<(), StorageError> {
        validate_bucket_name(name)?;
        let mut buckets = self.buckets.write().await;
        if !buckets.iter().any(|(bucket, _)| bucket == name) {
            buckets.push((name.to_string(), Cache::builder().build()));
        }
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.bucket(name).await.is_some())
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|(bucket, cache)| {
            if bucket == name {
                cache.invalidate_all();
                false
            } else {
                true
            }
        });
        Ok(buckets.len() != before)
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .buckets
            .read()
            .await
            .iter()
            .map(|(bucket, _)| bucket.clone())
            .collect())
    }

    async fn put(
        &self,
        bucket: &str,
        key: RequestKey,
        response: Response,
    ) -> Result<(), StorageError> {
        let cache = self
            .bucket(bucket)
            .await
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        cache.insert(key, response).await;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &RequestKey) -> Result<Option<Response>, StorageError> {
        match self.bucket(bucket).await {
            Some(cache) => Ok(cache.get(key).await),
            None => Ok(None),
        }
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<RequestKey>, StorageError> {
        let cache = self
            .bucket(bucket)
            .await
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        let mut keys: Vec<RequestKey> = cache.iter().map(|(key, _)| (*key).clone()).collect();
        keys.sort();
        Ok(keys)
    }
}
