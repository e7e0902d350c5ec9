//! Application shell manifest.
//!
//! The shell is the fixed set of assets the UI needs to render with no
//! network. It is fetched in full when the worker installs and lives in the
//! bucket named by the current version tag.

use url::Url;

/// Version tag of the current cache bucket.
///
/// Bump this on every deployment that changes a cached asset. Activation
/// deletes every bucket with a different name.
pub const CACHE_NAME: &str = "ecommerce-pwa-cache-v1";

/// Shell document served for navigations while offline.
pub const SHELL_DOCUMENT: &str = "/index.html";

/// Root-relative shell assets, resolved against the app origin.
pub const SHELL_ASSETS: &[&str] = &[
    "/",
    SHELL_DOCUMENT,
    "/style.css",
    "/app.js",
    "/manifest.json",
    "/icons/icon-72x72.png",
    "/icons/icon-96x96.png",
    "/icons/icon-128x128.png",
    "/icons/icon-144x144.png",
    "/icons/icon-152x152.png",
    "/icons/icon-192x192.png",
    "/icons/icon-384x384.png",
    "/icons/icon-512x512.png",
];

/// Third-party font resources cached alongside the shell.
pub const FONT_ASSETS: &[&str] = &[
    "https://fonts.googleapis.com/css2?family=Montserrat:wght@400;600;700&family=Open+Sans:wght@400;600&display=swap",
    "https://fonts.gstatic.com/s/montserrat/v25/JTUSjIg1_i6t8kCHKm459Wlhyw.woff2",
    "https://fonts.gstatic.com/s/opensans/v27/memvYaGs126MiZpBA-tsgP-PzV0.woff2",
];

/// Ordered list of absolute URLs to populate at install time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellManifest {
    urls: Vec<Url>,
}

impl ShellManifest {
    /// Create a manifest from absolute URLs.
    #[must_use]
    pub const fn new(urls: Vec<Url>) -> Self {
        Self { urls }
    }

    /// The default storefront shell: app assets under `origin` plus fonts.
    ///
    /// # Errors
    ///
    /// Returns an error if an asset path cannot be joined onto `origin`.
    pub fn for_origin(origin: &Url) -> Result<Self, url::ParseError> {
        let mut urls = SHELL_ASSETS
            .iter()
            .map(|path| origin.join(path))
            .collect::<Result<Vec<_>, _>>()?;
        for font in FONT_ASSETS {
            urls.push(Url::parse(font)?);
        }
        Ok(Self { urls })
    }

    /// Manifest entries in install order.
    #[must_use]
    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_for_origin_resolves_relative_assets() {
        let origin = Url::parse("https://shop.example").unwrap();
        let manifest = ShellManifest::for_origin(&origin).unwrap();

        assert_eq!(manifest.len(), SHELL_ASSETS.len() + FONT_ASSETS.len());
        assert_eq!(manifest.urls()[0].as_str(), "https://shop.example/");
        assert_eq!(manifest.urls()[1].as_str(), "https://shop.example/index.html");
        assert!(
            manifest
                .urls()
                .iter()
                .any(|u| u.host_str() == Some("fonts.gstatic.com"))
        );
    }
}
