//! Offline proxy configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `OFFLINE_ORIGIN` - Origin of the storefront being fronted (e.g., <http://127.0.0.1:3000>)
//!
//! ## Optional
//! - `OFFLINE_HOST` - Bind address (default: 127.0.0.1)
//! - `OFFLINE_PORT` - Listen port (default: 3080)
//! - `OFFLINE_CACHE_VERSION` - Current bucket name (default: ecommerce-pwa-cache-v1)
//! - `OFFLINE_CACHE_DIR` - Persist buckets under this directory (default: in memory)
//! - `OFFLINE_ALLOWED_HOSTS` - Comma-separated extra hosts whose responses are cached (default: placehold.co)
//! - `OFFLINE_LOOKUP_SCOPE` - `all` or `current` buckets consulted on fetch (default: all)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::manager::{CacheSettings, LookupScope};
use crate::manifest::CACHE_NAME;
use crate::network::OriginPolicy;

const DEFAULT_ALLOWED_HOSTS: &str = "placehold.co";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Offline proxy configuration.
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    /// IP address to bind the proxy to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Storefront origin requests are forwarded to
    pub origin: Url,
    /// Current bucket name
    pub cache_version: String,
    /// Directory for persistent buckets; in-memory when unset
    pub cache_dir: Option<PathBuf>,
    /// Hosts besides the origin whose responses are cached
    pub allowed_hosts: Vec<String>,
    pub lookup_scope: LookupScope,
}

impl OfflineConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("OFFLINE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("OFFLINE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("OFFLINE_PORT", "3080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("OFFLINE_PORT".to_string(), e.to_string()))?;
        let origin = parse_origin(&get_required_env("OFFLINE_ORIGIN")?)
            .map_err(|e| ConfigError::InvalidEnvVar("OFFLINE_ORIGIN".to_string(), e))?;
        let lookup_scope = get_env_or_default("OFFLINE_LOOKUP_SCOPE", "all")
            .parse::<LookupScope>()
            .map_err(|e| ConfigError::InvalidEnvVar("OFFLINE_LOOKUP_SCOPE".to_string(), e))?;

        Ok(Self {
            host,
            port,
            origin,
            cache_version: get_env_or_default("OFFLINE_CACHE_VERSION", CACHE_NAME),
            cache_dir: get_optional_env("OFFLINE_CACHE_DIR").map(PathBuf::from),
            allowed_hosts: parse_allowed_hosts(&get_env_or_default(
                "OFFLINE_ALLOWED_HOSTS",
                DEFAULT_ALLOWED_HOSTS,
            )),
            lookup_scope,
        })
    }

    /// Returns the socket address for binding the proxy.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn origin_policy(&self) -> OriginPolicy {
        OriginPolicy::new(self.origin.clone(), self.allowed_hosts.clone())
    }

    /// Cache manager settings for this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell URLs cannot be resolved against the origin.
    pub fn cache_settings(&self) -> Result<CacheSettings, url::ParseError> {
        Ok(
            CacheSettings::new(self.origin.clone(), self.allowed_hosts.clone())?
                .with_version(self.cache_version.clone())
                .with_lookup_scope(self.lookup_scope),
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an origin URL, rejecting anything with a path, query or fragment.
fn parse_origin(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(format!("{value} is not an http(s) origin"));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(format!("{value} must not have a path, query or fragment"));
    }
    Ok(url)
}

fn parse_allowed_hosts(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}
