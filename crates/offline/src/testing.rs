//! Scripted network for tests.
//!
//! Routes are registered per URL; anything unregistered, or everything once
//! the network is switched offline, fails with [`NetworkError::Unreachable`].
//! Every call is counted so tests can assert that a cache hit made no
//! network round-trip.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use url::Url;

use crate::error::NetworkError;
use crate::network::{Network, OriginPolicy};
use crate::request::{Request, Response};

/// In-memory [`Network`] with canned responses.
#[derive(Clone)]
pub struct ScriptedNetwork {
    inner: Arc<ScriptedNetworkInner>,
}

struct ScriptedNetworkInner {
    policy: OriginPolicy,
    routes: Mutex<HashMap<String, (StatusCode, Bytes)>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedNetwork {
    /// Create a network that classifies responses with `policy`.
    #[must_use]
    pub fn new(policy: OriginPolicy) -> Self {
        Self {
            inner: Arc::new(ScriptedNetworkInner {
                policy,
                routes: Mutex::new(HashMap::new()),
                offline: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Answer `url` with `status` and `body`.
    pub fn route(&self, url: &Url, status: StatusCode, body: impl Into<Bytes>) {
        self.inner
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), (status, body.into()));
    }

    /// Answer `url` with `200 OK` and `body`.
    pub fn ok(&self, url: &Url, body: impl Into<Bytes>) {
        self.route(url, StatusCode::OK, body);
    }

    /// Simulate losing (or regaining) connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetches attempted so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable(request.url().to_string()));
        }

        let route = self
            .inner
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request.url().as_str())
            .cloned();

        let (status, body) =
            route.ok_or_else(|| NetworkError::Unreachable(request.url().to_string()))?;
        Ok(Response::new(
            status,
            self.inner.policy.classify(request.url()),
            HeaderMap::new(),
            body,
        ))
    }
}
