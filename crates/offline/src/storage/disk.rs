//! On-disk cache buckets.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   buckets.json                 bucket names in creation order
//!   buckets/<name>/<sha256>.json         entry metadata (key, status, headers, body file, stored_at)
//!   buckets/<name>/<sha256>.<uuid>.body  response body
//! ```
//!
//! Every write gets its own body file and its own temporary file. The
//! metadata is renamed into place last, so it always names a complete body
//! and concurrent stores of one key leave one of them intact. The body that
//! was replaced is removed afterwards; a reader that loses that race re-reads
//! the metadata.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CacheStorage, validate_bucket_name};
use crate::error::StorageError;
use crate::request::{RequestKey, Response, ResponseType};

const INDEX_FILE: &str = "buckets.json";
const BUCKETS_DIR: &str = "buckets";
const READ_ATTEMPTS: usize = 3;

/// Metadata stored next to each body file.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: RequestKey,
    status: u16,
    response_type: ResponseType,
    headers: Vec<(String, String)>,
    /// Body file name inside the bucket directory.
    body_file: String,
    stored_at: DateTime<Utc>,
}

/// Buckets persisted under a directory.
#[derive(Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
    // Serializes read-modify-write of the bucket index.
    index_lock: Arc<Mutex<()>>,
    // Serializes entry replacement within this process.
    entry_lock: Arc<Mutex<()>>,
}

impl DiskCacheStorage {
    /// Use `root` as the storage directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open_root(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(BUCKETS_DIR)).await?;
        Ok(Self {
            root,
            index_lock: Arc::new(Mutex::new(())),
            entry_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Storage directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_bucket_name(name)?;
        Ok(self.root.join(BUCKETS_DIR).join(name))
    }

    fn entry_stem(key: &RequestKey) -> String {
        hex::encode(Sha256::digest(key.as_str().as_bytes()))
    }

    async fn read_index(&self) -> Result<Vec<String>, StorageError> {
        match tokio::fs::read(self.root.join(INDEX_FILE)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_index(&self, names: &[String]) -> Result<(), StorageError> {
        write_atomic(&self.root.join(INDEX_FILE), &serde_json::to_vec(names)?).await
    }

    /// Metadata of an entry, or `None` if it is not stored.
    async fn read_meta(dir: &Path, stem: &str) -> Result<Option<EntryMeta>, StorageError> {
        match tokio::fs::read(dir.join(format!("{stem}.json"))).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<(), StorageError> {
        let dir = self.bucket_dir(name)?;
        let _guard = self.index_lock.lock().await;
        tokio::fs::create_dir_all(&dir).await?;
        let mut names = self.read_index().await?;
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
            self.write_index(&names).await?;
        }
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.read_index().await?.iter().any(|n| n == name))
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let dir = self.bucket_dir(name)?;
        let _guard = self.index_lock.lock().await;
        let mut names = self.read_index().await?;
        let before = names.len();
        names.retain(|n| n != name);
        let existed = names.len() != before;
        if existed {
            self.write_index(&names).await?;
        }
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(existed)
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.read_index().await
    }

    async fn put(
        &self,
        bucket: &str,
        key: RequestKey,
        response: Response,
    ) -> Result<(), StorageError> {
        let dir = self.bucket_dir(bucket)?;
        if !self.has(bucket).await? {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }

        let stem = Self::entry_stem(&key);
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body_file = format!("{stem}.{}.body", Uuid::new_v4().simple());
        let meta = EntryMeta {
            key,
            status: response.status().as_u16(),
            response_type: response.response_type(),
            headers,
            body_file: body_file.clone(),
            stored_at: Utc::now(),
        };

        let _guard = self.entry_lock.lock().await;
        let replaced = Self::read_meta(&dir, &stem).await.ok().flatten();

        write_atomic(&dir.join(&body_file), response.body()).await?;
        let meta_written =
            write_atomic(&dir.join(format!("{stem}.json")), &serde_json::to_vec(&meta)?).await;
        if let Err(e) = meta_written {
            let _ = tokio::fs::remove_file(dir.join(&body_file)).await;
            return Err(e);
        }

        if let Some(old) = replaced.filter(|old| old.body_file != body_file) {
            match tokio::fs::remove_file(dir.join(&old.body_file)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(error = %e, file = %old.body_file, "Failed to remove replaced body");
                }
            }
        }
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &RequestKey) -> Result<Option<Response>, StorageError> {
        let dir = self.bucket_dir(bucket)?;
        let stem = Self::entry_stem(key);

        // The body named by the metadata can be replaced between the two reads.
        for _ in 0..READ_ATTEMPTS {
            let Some(meta) = Self::read_meta(&dir, &stem).await? else {
                return Ok(None);
            };
            match tokio::fs::read(dir.join(&meta.body_file)).await {
                Ok(body) => return decode(meta, body).map(Some),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::warn!(key = %key, "Cache entry kept changing while reading, treating as miss");
        Ok(None)
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<RequestKey>, StorageError> {
        let dir = self.bucket_dir(bucket)?;
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::BucketNotFound(bucket.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let meta: EntryMeta = serde_json::from_slice(&tokio::fs::read(&path).await?)?;
                keys.push(meta.key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn decode(meta: EntryMeta, body: Vec<u8>) -> Result<Response, StorageError> {
    let status = StatusCode::from_u16(meta.status)
        .map_err(|_| StorageError::InvalidHeader(format!("status {}", meta.status)))?;
    let mut headers = HeaderMap::new();
    for (name, value) in meta.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| StorageError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(&value).map_err(|_| StorageError::InvalidHeader(name))?;
        headers.append(header_name, header_value);
    }

    Ok(Response::new(
        status,
        meta.response_type,
        headers,
        Bytes::from(body),
    ))
}

/// Write `contents` to a uniquely named sibling temp file, then rename over `path`.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{name}.{}.tmp", Uuid::new_v4().simple()));
    if let Err(e) = tokio::fs::write(&tmp, contents).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
