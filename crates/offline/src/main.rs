//! E-Shop offline proxy.
//!
//! Serves on port 3080 in front of the storefront. Every request is routed
//! through the offline worker, so the storefront stays browsable from cache
//! when the origin is unreachable.

#![cfg_attr(not(test), forbid(unsafe_code))]

use eshop_offline::config::OfflineConfig;
use eshop_offline::{
    CacheManager, CacheStorage, DiskCacheStorage, HttpNetwork, MemoryCacheStorage, Network,
    OfflineWorker, proxy,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let config = OfflineConfig::from_env().expect("Failed to load configuration");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "eshop_offline=info,tower_http=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = config
        .cache_settings()
        .expect("Failed to resolve app shell URLs");
    let network = HttpNetwork::new(config.origin_policy());

    match &config.cache_dir {
        Some(dir) => {
            let storage = DiskCacheStorage::open_root(dir)
                .await
                .expect("Failed to open cache directory");
            tracing::info!(dir = %dir.display(), "Using disk cache storage");
            serve(&config, CacheManager::new(storage, network, settings)).await;
        }
        None => {
            tracing::info!("Using in-memory cache storage");
            serve(
                &config,
                CacheManager::new(MemoryCacheStorage::new(), network, settings),
            )
            .await;
        }
    }
}

async fn serve<S: CacheStorage, N: Network>(config: &OfflineConfig, manager: CacheManager<S, N>) {
    let (worker, mut commands, task) = OfflineWorker::spawn(manager);

    // No browser windows here; client commands are only logged.
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            tracing::info!(?command, "Client command");
        }
    });

    match worker.install().await {
        Ok(()) => match worker.activate().await {
            Ok(deleted) => tracing::info!(deleted = deleted.len(), "Offline worker activated"),
            Err(e) => tracing::error!(error = %e, "Activation finished with errors"),
        },
        Err(e) => {
            tracing::error!(error = %e, "Install failed; forwarding requests without caching");
        }
    }

    let app = proxy::router(worker, config.origin.clone()).layer(TraceLayer::new_for_http());

    let addr = config.socket_addr();
    tracing::info!(origin = %config.origin, "offline proxy listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // The router owned the last worker handle; wait for in-flight fetches.
    if let Err(e) = task.await {
        tracing::error!(error = %e, "Offline worker task failed");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
