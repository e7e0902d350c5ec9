//! Error types for the offline cache manager.
//!
//! None of these reach the page during fetch interception: the fetch policy
//! degrades every failure to a cached fallback or a placeholder. They are
//! returned from lifecycle operations (install, activate) and storage
//! maintenance, and logged.

use axum::http::StatusCode;
use thiserror::Error;
use url::Url;

use crate::lifecycle::TransitionError;

/// Cache storage operation failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error in the disk backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry metadata could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Bucket name is empty or would escape the storage root.
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    /// Bucket has not been opened.
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// Stored header could not be turned back into a header.
    #[error("Invalid stored header: {0}")]
    InvalidHeader(String),
}

/// Network fetch failed before a response was received.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// HTTP client error (DNS, connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Host unreachable.
    #[error("Network unreachable: {0}")]
    Unreachable(String),
}

/// Shell installation failed. Nothing from the manifest was stored.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// A manifest URL could not be fetched.
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: Url,
        #[source]
        source: NetworkError,
    },

    /// A manifest URL answered with a non-success status.
    #[error("Bad status {status} for {url}")]
    BadStatus { url: Url, status: StatusCode },

    /// The bucket could not be opened or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Worker operation failed.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Install failed: {0}")]
    Install(#[from] InstallError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Push message body was not a valid payload.
    #[error("Invalid push payload: {0}")]
    Push(#[from] serde_json::Error),

    /// The worker task has stopped.
    #[error("Worker is not running")]
    Closed,
}
