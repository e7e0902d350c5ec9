//! Cache-first fetch policy and cache lifecycle.
//!
//! [`CacheManager`] implements the three lifecycle phases:
//!
//! - **install**: fetch the whole shell manifest; store it only if every
//!   fetch succeeded
//! - **activate**: delete every bucket whose name is not the current version tag
//! - **fetch**: cache hit, else network (storing a copy of eligible
//!   responses), else cached shell for navigations, else an offline placeholder
//!
//! The manager is cheaply cloneable; clones share storage, network, and state.

use std::str::FromStr;
use std::sync::Arc;

use axum::http::StatusCode;
use eshop_core::{Notification, NotificationClick, PushPayload};
use futures::future::try_join_all;
use tokio::sync::watch;
use tracing::instrument;
use url::Url;

use crate::clients::{ClientCommand, WindowClients};
use crate::error::{InstallError, StorageError, WorkerError};
use crate::lifecycle::{TransitionError, WorkerState};
use crate::manifest::{CACHE_NAME, SHELL_DOCUMENT, ShellManifest};
use crate::network::{Network, OriginPolicy};
use crate::request::{FetchResult, FetchSource, Request, RequestKey, Response, ResponseType};
use crate::storage::{self, CacheStorage};

/// Which buckets a fetch lookup consults.
///
/// `AllBuckets` matches the host's `caches.match()`, which ignores bucket
/// names. After activation only one bucket is left, so the two only differ
/// while a stale bucket is still around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupScope {
    #[default]
    AllBuckets,
    CurrentBucket,
}

impl FromStr for LookupScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all-buckets" => Ok(Self::AllBuckets),
            "current" | "current-bucket" => Ok(Self::CurrentBucket),
            other => Err(format!("unknown lookup scope: {other} (expected all or current)")),
        }
    }
}

/// Static settings of a cache manager.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Name of the current bucket.
    pub version: String,
    pub policy: OriginPolicy,
    pub manifest: ShellManifest,
    pub lookup_scope: LookupScope,
    shell_url: Url,
}

impl CacheSettings {
    /// Default settings for an app served from `origin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell URLs cannot be resolved against `origin`.
    pub fn new(origin: Url, allowed_hosts: Vec<String>) -> Result<Self, url::ParseError> {
        let manifest = ShellManifest::for_origin(&origin)?;
        let shell_url = origin.join(SHELL_DOCUMENT)?;
        Ok(Self {
            version: CACHE_NAME.to_string(),
            policy: OriginPolicy::new(origin, allowed_hosts),
            manifest,
            lookup_scope: LookupScope::default(),
            shell_url,
        })
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn with_manifest(mut self, manifest: ShellManifest) -> Self {
        self.manifest = manifest;
        self
    }

    #[must_use]
    pub const fn with_lookup_scope(mut self, lookup_scope: LookupScope) -> Self {
        self.lookup_scope = lookup_scope;
        self
    }

    /// Serialized app origin without a trailing slash (`https://shop.example`).
    #[must_use]
    pub fn origin_string(&self) -> String {
        self.policy.origin().origin().ascii_serialization()
    }

    /// URL of the shell document served to offline navigations.
    #[must_use]
    pub const fn shell_url(&self) -> &Url {
        &self.shell_url
    }
}

/// Offline cache manager.
pub struct CacheManager<S, N> {
    inner: Arc<CacheManagerInner<S, N>>,
}

struct CacheManagerInner<S, N> {
    storage: S,
    network: N,
    settings: CacheSettings,
    state: watch::Sender<WorkerState>,
}

impl<S, N> Clone for CacheManager<S, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CacheStorage, N: Network> CacheManager<S, N> {
    /// Create a manager in the `Parsed` state.
    #[must_use]
    pub fn new(storage: S, network: N, settings: CacheSettings) -> Self {
        let (state, _) = watch::channel(WorkerState::Parsed);
        Self {
            inner: Arc::new(CacheManagerInner {
                storage,
                network,
                settings,
                state,
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CacheSettings {
        &self.inner.settings
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.inner.storage
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.inner.state.borrow()
    }

    /// Watch lifecycle state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.inner.state.subscribe()
    }

    fn transition(&self, to: WorkerState) -> Result<(), TransitionError> {
        let mut result = Ok(());
        self.inner.state.send_if_modified(|state| {
            if state.can_transition(to) {
                tracing::debug!(from = %state, to = %to, "Worker state change");
                *state = to;
                true
            } else {
                result = Err(TransitionError { from: *state, to });
                false
            }
        });
        result
    }

    // =========================================================================
    // Install
    // =========================================================================

    /// Populate the current bucket with the shell manifest.
    ///
    /// All-or-nothing: every manifest URL is fetched before anything is
    /// stored, and a single failed fetch stores nothing and leaves the
    /// worker `Redundant`.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker is not in the `Parsed` state, if any
    /// manifest fetch fails or returns a non-success status, or if storage fails.
    #[instrument(skip(self), fields(cache = %self.inner.settings.version))]
    pub async fn install(&self) -> Result<(), InstallError> {
        self.transition(WorkerState::Installing)?;

        match self.populate_shell().await {
            Ok(count) => {
                self.transition(WorkerState::Installed)?;
                tracing::info!(entries = count, "Cached app shell");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Cache addAll failed, install aborted");
                self.transition(WorkerState::Redundant)?;
                Err(e)
            }
        }
    }

    async fn populate_shell(&self) -> Result<usize, InstallError> {
        let settings = &self.inner.settings;
        self.inner.storage.open(&settings.version).await?;

        let fetches = settings.manifest.urls().iter().map(|url| async move {
            let request = Request::get(url.clone());
            let response = self
                .inner
                .network
                .fetch(&request)
                .await
                .map_err(|source| InstallError::Fetch {
                    url: url.clone(),
                    source,
                })?;
            if !response.status().is_success() {
                return Err(InstallError::BadStatus {
                    url: url.clone(),
                    status: response.status(),
                });
            }
            Ok((request.key(), response))
        });
        let entries = try_join_all(fetches).await?;

        let count = entries.len();
        self.inner
            .storage
            .put_all(&settings.version, entries)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Activate
    // =========================================================================

    /// Delete every bucket except the current one.
    ///
    /// The worker becomes `Activated` even if a deletion fails; the error is
    /// logged and returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker is not `Installed`, or if listing or
    /// deleting buckets fails.
    #[instrument(skip(self), fields(cache = %self.inner.settings.version))]
    pub async fn activate(&self) -> Result<Vec<String>, WorkerError> {
        self.transition(WorkerState::Activating)?;
        let result = self.delete_stale_buckets().await;
        self.transition(WorkerState::Activated)?;

        match result {
            Ok(deleted) => Ok(deleted),
            Err(e) => {
                tracing::error!(error = %e, "Failed to delete old caches");
                Err(e.into())
            }
        }
    }

    /// Delete every bucket whose name differs from the current version tag.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or deleting buckets fails.
    pub async fn delete_stale_buckets(&self) -> Result<Vec<String>, StorageError> {
        storage::delete_stale(&self.inner.storage, &self.inner.settings.version).await
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// Answer a request issued by the page.
    ///
    /// Never fails: network errors degrade to the cached shell (navigations)
    /// or the offline placeholder. Before activation the cache is bypassed.
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn handle_fetch(&self, request: Request) -> FetchResult {
        if self.state() != WorkerState::Activated {
            return self.pass_through(&request).await;
        }

        if request.is_cacheable_method()
            && let Some(response) = self.lookup(&request.key()).await
        {
            tracing::debug!("Serving from cache");
            return FetchResult::new(response, FetchSource::Cache);
        }

        tracing::debug!("Fetching from network");
        match self.inner.network.fetch(&request).await {
            Ok(response) => {
                if self.should_store(&request, &response) {
                    self.store(request.key(), response.clone()).await;
                }
                FetchResult::new(response, FetchSource::Network)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Network fetch failed, serving offline fallback");
                self.offline_fallback(&request).await
            }
        }
    }

    async fn pass_through(&self, request: &Request) -> FetchResult {
        match self.inner.network.fetch(request).await {
            Ok(response) => FetchResult::new(response, FetchSource::PassThrough),
            Err(e) => {
                tracing::warn!(error = %e, "Network fetch failed before activation");
                FetchResult::new(Response::network_error(), FetchSource::PassThrough)
            }
        }
    }

    async fn lookup(&self, key: &RequestKey) -> Option<Response> {
        let storage = &self.inner.storage;
        let result = match self.inner.settings.lookup_scope {
            LookupScope::AllBuckets => storage.match_any(key).await,
            LookupScope::CurrentBucket => storage.get(&self.inner.settings.version, key).await,
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, key = %key, "Cache lookup failed");
            None
        })
    }

    fn should_store(&self, request: &Request, response: &Response) -> bool {
        request.is_cacheable_method()
            && response.status() == StatusCode::OK
            && response.response_type() == ResponseType::Basic
            && self.inner.settings.policy.is_cacheable_origin(request.url())
    }

    async fn store(&self, key: RequestKey, response: Response) {
        let storage = &self.inner.storage;
        let version = &self.inner.settings.version;
        let result = match storage.open(version).await {
            Ok(()) => storage.put(version, key, response).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to cache network response");
        }
    }

    async fn offline_fallback(&self, request: &Request) -> FetchResult {
        if request.is_navigation() {
            let shell = RequestKey::get(self.inner.settings.shell_url());
            if let Some(response) = self.lookup(&shell).await {
                return FetchResult::new(response, FetchSource::ShellFallback);
            }
        }
        FetchResult::new(Response::offline_placeholder(), FetchSource::Placeholder)
    }

    // =========================================================================
    // Push & notification click
    // =========================================================================

    /// Turn a push message into a notification to show.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not a JSON push payload.
    pub fn push(&self, data: &[u8]) -> Result<Notification, WorkerError> {
        let payload = PushPayload::from_slice(data)?;
        tracing::info!(title = ?payload.title, "Push received");
        Ok(payload.into_notification(&self.inner.settings.origin_string()))
    }

    /// Focus the window showing the notification's URL, or open one.
    pub fn notification_click(
        &self,
        click: NotificationClick,
        clients: &mut WindowClients,
    ) -> ClientCommand {
        let url = click
            .url
            .unwrap_or_else(|| self.inner.settings.origin_string());
        tracing::info!(url = %url, "Notification clicked");
        clients.focus_or_open(&url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::request::OFFLINE_PLACEHOLDER_HTML;
    use crate::storage::MemoryCacheStorage;
    use crate::testing::ScriptedNetwork;

    const ORIGIN: &str = "https://shop.example";

    fn origin() -> Url {
        Url::parse(ORIGIN).unwrap()
    }

    fn url(path: &str) -> Url {
        origin().join(path).unwrap()
    }

    fn small_manifest() -> ShellManifest {
        ShellManifest::new(vec![url("/"), url("/index.html"), url("/app.js")])
    }

    fn setup() -> (
        CacheManager<MemoryCacheStorage, ScriptedNetwork>,
        MemoryCacheStorage,
        ScriptedNetwork,
    ) {
        let settings = CacheSettings::new(origin(), vec!["placehold.co".to_string()])
            .unwrap()
            .with_version("v1-current")
            .with_manifest(small_manifest());
        let storage = MemoryCacheStorage::new();
        let network = ScriptedNetwork::new(settings.policy.clone());
        network.ok(&url("/"), "<html>root</html>");
        network.ok(&url("/index.html"), "<html>shell</html>");
        network.ok(&url("/app.js"), "console.log(1)");
        let manager = CacheManager::new(storage.clone(), network.clone(), settings);
        (manager, storage, network)
    }

    async fn activated() -> (
        CacheManager<MemoryCacheStorage, ScriptedNetwork>,
        MemoryCacheStorage,
        ScriptedNetwork,
    ) {
        let (manager, storage, network) = setup();
        manager.install().await.unwrap();
        manager.activate().await.unwrap();
        (manager, storage, network)
    }

    #[tokio::test]
    async fn test_install_stores_whole_manifest() {
        let (manager, storage, _) = setup();
        manager.install().await.unwrap();

        assert_eq!(manager.state(), WorkerState::Installed);
        assert_eq!(storage.entries("v1-current").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let (manager, storage, network) = setup();
        network.route(&url("/app.js"), StatusCode::NOT_FOUND, "");

        let err = manager.install().await.unwrap_err();
        assert!(matches!(err, InstallError::BadStatus { .. }));
        assert_eq!(manager.state(), WorkerState::Redundant);
        assert!(storage.entries("v1-current").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_fails_when_offline() {
        let (manager, storage, network) = setup();
        network.set_offline(true);

        let err = manager.install().await.unwrap_err();
        assert!(matches!(err, InstallError::Fetch { .. }));
        assert!(storage.entries("v1-current").await.unwrap().is_empty());
        assert!(manager.activate().await.is_err());
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let (manager, _, _) = setup();
        manager.install().await.unwrap();
        assert!(matches!(
            manager.install().await,
            Err(InstallError::Transition(_))
        ));
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_buckets() {
        let (manager, storage, _) = setup();
        storage.open("v1-old").await.unwrap();
        manager.install().await.unwrap();

        let deleted = manager.activate().await.unwrap();
        assert_eq!(deleted, vec!["v1-old"]);
        assert_eq!(storage.keys().await.unwrap(), vec!["v1-current"]);
        assert_eq!(manager.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_network_call() {
        let (manager, _, network) = activated().await;
        let calls = network.calls();

        let result = manager.handle_fetch(Request::get(url("/app.js"))).await;
        assert_eq!(result.source, FetchSource::Cache);
        assert_eq!(result.response.body().as_ref(), b"console.log(1)");
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_miss_is_fetched_and_stored() {
        let (manager, storage, network) = activated().await;
        network.ok(&url("/style.css"), "body{}");

        let first = manager.handle_fetch(Request::get(url("/style.css"))).await;
        assert_eq!(first.source, FetchSource::Network);
        assert!(
            storage
                .get("v1-current", &RequestKey::get(&url("/style.css")))
                .await
                .unwrap()
                .is_some()
        );

        let calls = network.calls();
        let second = manager.handle_fetch(Request::get(url("/style.css"))).await;
        assert_eq!(second.source, FetchSource::Cache);
        assert_eq!(second.response.body().as_ref(), b"body{}");
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_allow_listed_host_is_stored() {
        let (manager, storage, network) = activated().await;
        let image = Url::parse("https://placehold.co/300x200?text=Speaker").unwrap();
        network.ok(&image, "png");

        manager.handle_fetch(Request::get(image.clone())).await;
        assert!(
            storage
                .get("v1-current", &RequestKey::get(&image))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_ineligible_responses_are_not_stored() {
        let (manager, storage, network) = activated().await;
        let font = Url::parse("https://fonts.gstatic.com/s/x.woff2").unwrap();
        network.ok(&font, "woff");
        network.route(&url("/missing"), StatusCode::NOT_FOUND, "nope");

        let result = manager.handle_fetch(Request::get(font.clone())).await;
        assert_eq!(result.source, FetchSource::Network);
        let result = manager.handle_fetch(Request::get(url("/missing"))).await;
        assert_eq!(result.response.status(), StatusCode::NOT_FOUND);

        assert!(storage.match_any(&RequestKey::get(&font)).await.unwrap().is_none());
        assert!(
            storage
                .match_any(&RequestKey::get(&url("/missing")))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_post_is_never_served_from_cache() {
        let (manager, _, network) = activated().await;
        network.ok(&url("/app.js"), "fresh");

        let request = Request::new(
            axum::http::Method::POST,
            url("/app.js"),
            crate::request::RequestMode::SameOrigin,
        );
        let result = manager.handle_fetch(request).await;
        assert_eq!(result.source, FetchSource::Network);
        assert_eq!(result.response.body().as_ref(), b"fresh");
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_shell() {
        let (manager, _, network) = activated().await;
        network.set_offline(true);

        let result = manager
            .handle_fetch(Request::navigate(url("/products?page=2")))
            .await;
        assert_eq!(result.source, FetchSource::ShellFallback);
        assert_eq!(result.response.body().as_ref(), b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_offline_subresource_gets_placeholder() {
        let (manager, _, network) = activated().await;
        network.set_offline(true);

        let result = manager.handle_fetch(Request::get(url("/icons/new.png"))).await;
        assert_eq!(result.source, FetchSource::Placeholder);
        assert_eq!(result.response.status(), StatusCode::OK);
        assert_eq!(
            result.response.body().as_ref(),
            OFFLINE_PLACEHOLDER_HTML.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_offline_navigation_without_shell_gets_placeholder() {
        let (manager, storage, network) = activated().await;
        storage.delete("v1-current").await.unwrap();
        network.set_offline(true);

        let result = manager.handle_fetch(Request::navigate(url("/"))).await;
        assert_eq!(result.source, FetchSource::Placeholder);
    }

    #[tokio::test]
    async fn test_all_buckets_scope_finds_stale_entries() {
        let (manager, storage, network) = activated().await;
        storage.open("v0-leftover").await.unwrap();
        storage
            .put(
                "v0-leftover",
                RequestKey::get(&url("/old.css")),
                Response::html(StatusCode::OK, "old"),
            )
            .await
            .unwrap();
        network.set_offline(true);

        let result = manager.handle_fetch(Request::get(url("/old.css"))).await;
        assert_eq!(result.source, FetchSource::Cache);
        assert_eq!(result.response.body().as_ref(), b"old");
    }

    #[tokio::test]
    async fn test_fetch_before_activation_bypasses_cache() {
        let (manager, _, network) = setup();
        manager.install().await.unwrap();
        network.set_offline(true);

        let result = manager.handle_fetch(Request::get(url("/app.js"))).await;
        assert_eq!(result.source, FetchSource::PassThrough);
        assert_eq!(result.response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_current_bucket_scope_ignores_stale_buckets() {
        let (_, storage, network) = setup();
        let settings = CacheSettings::new(origin(), vec![])
            .unwrap()
            .with_version("v1-current")
            .with_manifest(small_manifest())
            .with_lookup_scope(LookupScope::CurrentBucket);
        let manager = CacheManager::new(storage.clone(), network.clone(), settings);
        manager.install().await.unwrap();
        manager.activate().await.unwrap();

        // Written after activation, as a concurrent writer might.
        storage.open("v0-leftover").await.unwrap();
        storage
            .put(
                "v0-leftover",
                RequestKey::get(&url("/old.css")),
                Response::html(StatusCode::OK, "old"),
            )
            .await
            .unwrap();
        network.set_offline(true);

        let result = manager.handle_fetch(Request::get(url("/old.css"))).await;
        assert_eq!(result.source, FetchSource::Placeholder);
    }

    #[test]
    fn test_lookup_scope_parse() {
        assert_eq!("all".parse::<LookupScope>().unwrap(), LookupScope::AllBuckets);
        assert_eq!(
            "Current".parse::<LookupScope>().unwrap(),
            LookupScope::CurrentBucket
        );
        assert!("some".parse::<LookupScope>().is_err());
    }

    #[tokio::test]
    async fn test_push_defaults_to_origin() {
        let (manager, _, _) = setup();
        let notification = manager.push(br#"{"body":"Sale"}"#).unwrap();
        assert_eq!(notification.body, "Sale");
        assert_eq!(notification.url, ORIGIN);
        assert!(manager.push(b"garbage").is_err());
    }

    #[tokio::test]
    async fn test_notification_click_defaults_to_origin() {
        let (manager, _, _) = setup();
        let mut clients = WindowClients::new();
        let id = clients.register(ORIGIN);

        let command = manager.notification_click(NotificationClick { url: None }, &mut clients);
        assert_eq!(
            command,
            ClientCommand::Focus {
                client_id: id,
                url: ORIGIN.to_string(),
            }
        );
    }
}
