//! Forward proxy that routes page requests through the offline worker.
//!
//! # Route Structure
//!
//! ```text
//! GET  /__worker/state              - Lifecycle state (JSON)
//! GET  /__worker/clients            - Connected windows (JSON)
//! POST /__worker/push               - Deliver a push message (raw JSON body)
//! POST /__worker/notification-click - Report a notification click
//! *    /*                           - Everything else goes through the fetch policy
//! ```
//!
//! Every intercepted response carries an `x-eshop-cache` header naming where
//! it came from (`cache`, `network`, `shell-fallback`, `placeholder`,
//! `pass-through`).

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, uri::PathAndQuery},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use eshop_core::NotificationClick;
use serde_json::json;
use url::Url;

use crate::request::{FetchResult, Request, RequestMode};
use crate::worker::OfflineWorkerHandle;

/// Header naming the source of an intercepted response.
pub const CACHE_SOURCE_HEADER: &str = "x-eshop-cache";

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Hop-by-hop headers plus the ones the HTTP stack recomputes.
const SKIPPED_HEADERS: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Clone)]
struct ProxyState {
    worker: OfflineWorkerHandle,
    origin: Url,
}

/// Build the proxy router for the storefront at `origin`.
pub fn router(worker: OfflineWorkerHandle, origin: Url) -> Router {
    Router::new()
        .route("/__worker/state", get(worker_state))
        .route("/__worker/clients", get(worker_clients))
        .route("/__worker/push", post(push))
        .route("/__worker/notification-click", post(notification_click))
        .fallback(intercept)
        .with_state(ProxyState { worker, origin })
}

async fn worker_state(State(state): State<ProxyState>) -> impl IntoResponse {
    Json(json!({ "state": state.worker.state() }))
}

async fn worker_clients(State(state): State<ProxyState>) -> Response {
    match state.worker.clients().await {
        Ok(clients) => Json(clients).into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

async fn push(State(state): State<ProxyState>, body: Bytes) -> Response {
    match state.worker.push(body).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

async fn notification_click(
    State(state): State<ProxyState>,
    Json(click): Json<NotificationClick>,
) -> Response {
    match state.worker.notification_click(click).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

/// Translate an inbound request and hand it to the worker.
async fn intercept(State(state): State<ProxyState>, request: axum::extract::Request) -> Response {
    let (parts, body) = request.into_parts();

    let path = parts
        .uri
        .path_and_query()
        .map_or("/", PathAndQuery::as_str);
    let url = match state.origin.join(path) {
        Ok(url) if url.origin() == state.origin.origin() => url,
        _ => return (StatusCode::BAD_REQUEST, "Invalid request path").into_response(),
    };

    let Ok(body) = axum::body::to_bytes(body, MAX_BODY_BYTES).await else {
        return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
    };

    let mode = parts
        .headers
        .get("sec-fetch-mode")
        .and_then(|value| value.to_str().ok())
        .map(RequestMode::from_sec_fetch_mode)
        .unwrap_or_default();

    let request = Request::new(parts.method, url, mode)
        .with_headers(forwardable(&parts.headers))
        .with_body(body);

    match state.worker.fetch(request).await {
        Ok(result) => into_response(result),
        Err(e) => {
            tracing::error!(error = %e, "Offline worker unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "Offline worker unavailable").into_response()
        }
    }
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !SKIPPED_HEADERS.contains(&name.as_str()) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

fn into_response(result: FetchResult) -> Response {
    let (status, headers, body) = result.response.into_parts();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = forwardable(&headers);
    response.headers_mut().insert(
        CACHE_SOURCE_HEADER,
        HeaderValue::from_static(result.source.as_str()),
    );
    response
}
