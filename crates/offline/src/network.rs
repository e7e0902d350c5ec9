//! Network access for the cache manager.
//!
//! The [`Network`] trait is the seam between the fetch policy and the real
//! network; [`HttpNetwork`] implements it with `reqwest`.

use std::future::Future;

use bytes::Bytes;
use tracing::instrument;
use url::Url;

use crate::error::NetworkError;
use crate::request::{Request, Response, ResponseType};

/// Performs network fetches.
pub trait Network: Send + Sync + 'static {
    /// Fetch `request` from the network.
    ///
    /// Any HTTP status is a successful fetch; only failing to get a response
    /// at all (offline, DNS, connection reset) is an error.
    fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response, NetworkError>> + Send;
}

/// Decides which origins count as the app's own.
///
/// Responses from the app origin, or from an allow-listed host such as the
/// product image placeholder service, are treated as same-origin-equivalent
/// (`basic`) and are eligible for runtime caching.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    origin: Url,
    allowed_hosts: Vec<String>,
}

impl OriginPolicy {
    #[must_use]
    pub const fn new(origin: Url, allowed_hosts: Vec<String>) -> Self {
        Self {
            origin,
            allowed_hosts,
        }
    }

    /// The app origin.
    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    #[must_use]
    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }

    /// Whether `url` is on the app origin.
    #[must_use]
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    /// Whether `url` is on the app origin or an allow-listed host.
    #[must_use]
    pub fn is_cacheable_origin(&self, url: &Url) -> bool {
        self.is_same_origin(url)
            || url
                .host_str()
                .is_some_and(|host| self.allowed_hosts.iter().any(|allowed| allowed == host))
    }

    /// Classify a response to a request for `url`.
    #[must_use]
    pub fn classify(&self, url: &Url) -> ResponseType {
        if self.is_cacheable_origin(url) {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        }
    }
}

/// `reqwest`-backed network.
#[derive(Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    policy: OriginPolicy,
}

impl HttpNetwork {
    /// Create a network client.
    ///
    /// Redirects are handed back to the page rather than followed.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(policy: OriginPolicy) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self { client, policy }
    }
}

impl Network for HttpNetwork {
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if !request.body().is_empty() {
            builder = builder.body(request.body().clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body: Bytes = response.bytes().await?;

        tracing::debug!(status = %status, bytes = body.len(), "Network response");

        Ok(Response::new(
            status,
            self.policy.classify(request.url()),
            headers,
            body,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn policy() -> OriginPolicy {
        OriginPolicy::new(
            Url::parse("https://shop.example").unwrap(),
            vec!["placehold.co".to_string()],
        )
    }

    #[test]
    fn test_same_origin() {
        let policy = policy();
        assert!(policy.is_same_origin(&Url::parse("https://shop.example/app.js").unwrap()));
        assert!(!policy.is_same_origin(&Url::parse("http://shop.example/app.js").unwrap()));
        assert!(!policy.is_same_origin(&Url::parse("https://cdn.example/app.js").unwrap()));
    }

    #[test]
    fn test_allow_listed_host_is_cacheable() {
        let policy = policy();
        let image = Url::parse("https://placehold.co/300x200?text=Speaker").unwrap();
        assert!(policy.is_cacheable_origin(&image));
        assert_eq!(policy.classify(&image), ResponseType::Basic);

        let font = Url::parse("https://fonts.gstatic.com/s/x.woff2").unwrap();
        assert!(!policy.is_cacheable_origin(&font));
        assert_eq!(policy.classify(&font), ResponseType::Cors);
    }
}
