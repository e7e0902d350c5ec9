//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Shell document (`?section=products|cart`)
//! GET  /index.html             - Same shell document
//! GET  /health                 - Health check
//! GET  /manifest.json          - Web app manifest
//!
//! # Fragments
//! GET  /products               - Product grid
//!
//! # Cart (form posts, `product_id`)
//! POST /cart/state             - Current cart body and count
//! POST /cart/add               - Add one unit
//! POST /cart/increase          - Add one unit of a cart line
//! POST /cart/decrease          - Remove one unit
//! POST /cart/remove            - Remove the whole line
//!
//! # Notifications
//! POST /notifications/enable   - Report the permission prompt result
//!
//! # Static
//! GET  /style.css, /app.js, /icons/*
//! ```
//!
//! Every response to a `GET` may be stored by the offline cache and replayed
//! indefinitely, so `GET` routes never render the cart. Cart state is only
//! returned from `POST`s.
//!
//! Posts sent with `x-requested-with: fetch` get a fragment or JSON back;
//! plain form posts are redirected to the shell.

pub mod cart;
pub mod home;
pub mod manifest;
pub mod notifications;
pub mod products;

use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Header the page script sets on enhanced requests.
pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";

/// Whether the page script sent this request and expects a fragment back.
pub(crate) fn wants_fragment(headers: &HeaderMap) -> bool {
    headers
        .get(REQUESTED_WITH_HEADER)
        .is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"fetch"))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/state", post(cart::current))
        .route("/add", post(cart::add))
        .route("/increase", post(cart::increase))
        .route("/decrease", post(cart::decrease))
        .route("/remove", post(cart::remove))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Shell document
        .route("/", get(home::shell))
        .route("/index.html", get(home::shell))
        .route("/manifest.json", get(manifest::webmanifest))
        // Fragments
        .route("/products", get(products::grid))
        .nest("/cart", cart_routes())
        .route("/notifications/enable", post(notifications::enable))
}

/// The full storefront application: routes, static assets, health check.
///
/// Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let static_dir = state.config().static_dir.clone();

    Router::new()
        .route("/health", get(health))
        .merge(routes())
        .route_service("/style.css", ServeFile::new(static_dir.join("style.css")))
        .route_service("/app.js", ServeFile::new(static_dir.join("app.js")))
        .nest_service("/icons", ServeDir::new(static_dir.join("icons")))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use axum::{
        Router,
        body::Body,
        http::{Request, Response, header},
    };
    use url::Url;

    use crate::cart::MemoryCartStorage;
    use crate::catalog::Catalog;
    use crate::config::StorefrontConfig;
    use crate::state::AppState;

    pub async fn app_with(storage: MemoryCartStorage) -> Router {
        let config = StorefrontConfig::local(Url::parse("http://shop.test/").unwrap(), "unused");
        let state = AppState::new(config, Catalog::demo().unwrap(), storage).await;
        super::app(state)
    }

    pub async fn app() -> Router {
        app_with(MemoryCartStorage::new()).await
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post_form(uri: &str, body: &str, fetch: bool) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if fetch {
            builder = builder.header("x-requested-with", "fetch");
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    pub async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
