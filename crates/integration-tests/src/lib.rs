//! Integration tests for the E-Shop PWA.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p eshop-integration-tests
//! ```
//!
//! Each [`TestContext`] serves a real storefront and a real offline proxy on
//! ephemeral localhost ports. The offline worker reaches the storefront over
//! HTTP through a [`SwitchableNetwork`], which tests flip offline to exercise
//! the cache without stopping the server.
//!
//! # Test Categories
//!
//! - `offline_shell` - install, activate, and serving from cache
//! - `storefront_through_proxy` - cart and notifications via the proxy

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use eshop_offline::clients::ClientCommand;
use eshop_offline::manifest::{SHELL_ASSETS, ShellManifest};
use eshop_offline::{
    CacheManager, CacheSettings, HttpNetwork, MemoryCacheStorage, Network, NetworkError,
    OfflineWorker, OfflineWorkerHandle, Request, Response, proxy,
};
use eshop_storefront::cart::MemoryCartStorage;
use eshop_storefront::catalog::Catalog;
use eshop_storefront::config::StorefrontConfig;
use eshop_storefront::routes;
use eshop_storefront::state::AppState;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

/// HTTP network that can be switched off.
#[derive(Clone)]
pub struct SwitchableNetwork {
    inner: HttpNetwork,
    offline: Arc<AtomicBool>,
}

impl SwitchableNetwork {
    #[must_use]
    pub fn new(inner: HttpNetwork) -> Self {
        Self {
            inner,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulate losing (or regaining) connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl Network for SwitchableNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable(request.url().to_string()));
        }
        self.inner.fetch(request).await
    }
}

/// A running storefront with the offline proxy in front of it.
pub struct TestContext {
    /// Storefront origin (`http://127.0.0.1:<port>/`)
    pub origin: Url,
    /// Offline proxy base URL
    pub proxy: Url,
    pub worker: OfflineWorkerHandle,
    pub network: SwitchableNetwork,
    pub storage: MemoryCacheStorage,
    pub cart: MemoryCartStorage,
    pub commands: mpsc::UnboundedReceiver<ClientCommand>,
    /// Client for talking to the proxy; never follows redirects
    pub client: reqwest::Client,
}

impl TestContext {
    /// Start both servers. The worker is spawned but not installed.
    ///
    /// # Panics
    ///
    /// Panics if a listener cannot be bound.
    pub async fn start() -> Self {
        Self::start_with(MemoryCacheStorage::new()).await
    }

    /// Start both servers over existing cache storage.
    ///
    /// # Panics
    ///
    /// Panics if a listener cannot be bound.
    pub async fn start_with(storage: MemoryCacheStorage) -> Self {
        let (listener, origin) = bind().await;
        let cart = MemoryCartStorage::new();
        let config = StorefrontConfig::local(origin.clone(), "unused");
        let catalog = Catalog::demo().expect("demo catalog");
        let state = AppState::new(config, catalog, cart.clone()).await;
        spawn_server(listener, routes::app(state));

        // Fonts are third-party; keep the install to assets this server has.
        let shell = SHELL_ASSETS
            .iter()
            .map(|path| origin.join(path))
            .collect::<Result<Vec<_>, _>>()
            .expect("shell URLs");
        let settings = CacheSettings::new(origin.clone(), vec![])
            .expect("cache settings")
            .with_manifest(ShellManifest::new(shell));
        let network = SwitchableNetwork::new(HttpNetwork::new(settings.policy.clone()));
        let manager = CacheManager::new(storage.clone(), network.clone(), settings);
        let (worker, commands, _task) = OfflineWorker::spawn(manager);

        let (listener, proxy) = bind().await;
        spawn_server(listener, proxy::router(worker.clone(), origin.clone()));

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("reqwest client");

        Self {
            origin,
            proxy,
            worker,
            network,
            storage,
            cart,
            commands,
            client,
        }
    }

    /// Install and activate the worker.
    ///
    /// # Panics
    ///
    /// Panics if either step fails.
    pub async fn activate(&self) {
        self.worker.install().await.expect("install");
        self.worker.activate().await.expect("activate");
    }

    /// URL of `path` on the proxy.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid relative URL.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        self.proxy.join(path).expect("proxy URL")
    }

    /// `GET` through the proxy.
    ///
    /// # Panics
    ///
    /// Panics if the proxy cannot be reached.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("proxy request")
    }

    /// Top-level navigation through the proxy.
    ///
    /// # Panics
    ///
    /// Panics if the proxy cannot be reached.
    pub async fn navigate(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("sec-fetch-mode", "navigate")
            .send()
            .await
            .expect("proxy request")
    }

    /// Form `POST` through the proxy, optionally marked as a script request.
    ///
    /// # Panics
    ///
    /// Panics if the proxy cannot be reached.
    pub async fn post_form(&self, path: &str, body: &'static str, fetch: bool) -> reqwest::Response {
        let mut request = self
            .client
            .post(self.url(path))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body);
        if fetch {
            request = request.header("x-requested-with", "fetch");
        }
        request.send().await.expect("proxy request")
    }
}

/// Source label the proxy put on `response`.
#[must_use]
pub fn cache_source(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(proxy::CACHE_SOURCE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn bind() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let url = Url::parse(&format!("http://{addr}/")).expect("listener URL");
    (listener, url)
}

fn spawn_server(listener: TcpListener, app: Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });
}
