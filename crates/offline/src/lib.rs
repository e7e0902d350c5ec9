//! E-Shop offline cache manager.
//!
//! Keeps the storefront usable without connectivity. A worker task sits
//! between the page and the network, answers requests cache-first, and
//! falls back to the cached app shell (navigations) or a static placeholder
//! when both the cache and the network miss.
//!
//! # Architecture
//!
//! - [`manager`] - install / activate / fetch policy over a [`storage::CacheStorage`]
//! - [`worker`] - the worker task and its channel-based handle
//! - [`proxy`] - axum forward proxy feeding page requests to the worker
//! - [`storage`] - memory (`moka`) and disk bucket backends
//! - [`network`] - the [`network::Network`] seam and its `reqwest` implementation
//!
//! # Lifecycle
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//! ```
//!
//! Until the worker is `Activated`, requests go straight to the network.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clients;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod manifest;
pub mod network;
pub mod proxy;
pub mod request;
pub mod storage;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod worker;

pub use clients::{ClientCommand, WindowClient, WindowClients};
pub use error::{InstallError, NetworkError, StorageError, WorkerError};
pub use lifecycle::WorkerState;
pub use manager::{CacheManager, CacheSettings, LookupScope};
pub use network::{HttpNetwork, Network, OriginPolicy};
pub use request::{FetchResult, FetchSource, Request, RequestKey, RequestMode, Response};
pub use storage::{CacheStorage, DiskCacheStorage, MemoryCacheStorage};
pub use worker::{OfflineWorker, OfflineWorkerHandle};
