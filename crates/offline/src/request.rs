//! Request and response model for fetch interception.
//!
//! Bodies are held as [`Bytes`], so handing the caller one response and the
//! cache another is a cheap reference-counted clone; neither side can observe
//! the other consuming its copy.

use std::fmt;

use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Body returned for non-navigation requests when both cache and network fail.
pub const OFFLINE_PLACEHOLDER_HTML: &str =
    "<h1>Offline</h1><p>You are offline and this content is not cached.</p>";

/// How a request was issued by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    /// Same-origin only.
    SameOrigin,
    /// No CORS.
    #[default]
    NoCors,
    /// CORS.
    Cors,
}

impl RequestMode {
    /// Parse a `Sec-Fetch-Mode` header value.
    #[must_use]
    pub fn from_sec_fetch_mode(value: &str) -> Self {
        match value {
            "navigate" => Self::Navigate,
            "same-origin" => Self::SameOrigin,
            "cors" => Self::Cors,
            _ => Self::NoCors,
        }
    }
}

/// Cache lookup key: method plus absolute URL (fragment stripped).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    /// Build a key for `method url`.
    #[must_use]
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(format!("{method} {url}"))
    }

    /// Key for a plain `GET` of `url`.
    #[must_use]
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::GET, url)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request issued by the page.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    mode: RequestMode,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// Create a request.
    #[must_use]
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self {
            method,
            url,
            mode,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A subresource `GET`.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::NoCors)
    }

    /// A top-level navigation.
    #[must_use]
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub const fn mode(&self) -> RequestMode {
        self.mode
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Only `GET` requests are ever stored or matched.
    #[must_use]
    pub fn is_cacheable_method(&self) -> bool {
        self.method == Method::GET
    }

    #[must_use]
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

/// Response classification, after the Fetch standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin (or same-origin-equivalent) response.
    Basic,
    /// Cross-origin response read through CORS.
    Cors,
    /// Cross-origin response with an unreadable body.
    Opaque,
    /// Network error.
    Error,
    /// Created locally by the worker.
    Default,
}

/// A response snapshot.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    response_type: ResponseType,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create a response.
    #[must_use]
    pub const fn new(
        status: StatusCode,
        response_type: ResponseType,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            status,
            response_type,
            headers,
            body,
        }
    }

    /// A locally synthesized `text/html` response.
    #[must_use]
    pub fn html(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        Self::new(status, ResponseType::Default, headers, body.into())
    }

    /// Placeholder for uncached subresources while offline.
    #[must_use]
    pub fn offline_placeholder() -> Self {
        Self::html(StatusCode::OK, OFFLINE_PLACEHOLDER_HTML)
    }

    /// Network error surfaced when no worker policy applies.
    #[must_use]
    pub fn network_error() -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            ResponseType::Error,
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub const fn response_type(&self) -> ResponseType {
        self.response_type
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decompose into parts.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchSource {
    /// Served from a cache bucket; no network round-trip.
    Cache,
    /// Fetched from the network.
    Network,
    /// Network failed; cached shell document served for a navigation.
    ShellFallback,
    /// Network failed; offline placeholder synthesized.
    Placeholder,
    /// Worker not activated; request went straight to the network.
    PassThrough,
}

impl FetchSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Network => "network",
            Self::ShellFallback => "shell-fallback",
            Self::Placeholder => "placeholder",
            Self::PassThrough => "pass-through",
        }
    }
}

/// Intercepted response together with its provenance.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub response: Response,
    pub source: FetchSource,
}

impl FetchResult {
    #[must_use]
    pub const fn new(response: Response, source: FetchSource) -> Self {
        Self { response, source }
    }
}
