//! Push payloads and OS-level notifications.
//!
//! A push message arrives as JSON with every field optional. Missing fields
//! fall back to the storefront's defaults when the payload is turned into a
//! [`Notification`].

use serde::{Deserialize, Serialize};

/// Title used when a push payload carries none.
pub const DEFAULT_TITLE: &str = "E-Shop Update";
/// Body used when a push payload carries none.
pub const DEFAULT_BODY: &str = "New exciting offers available!";
/// Icon used when a push payload carries none.
pub const DEFAULT_ICON: &str = "/icons/icon-192x192.png";
/// Badge used when a push payload carries none.
pub const DEFAULT_BADGE: &str = "/icons/icon-72x72.png";
/// Vibration pattern (milliseconds) used when a push payload carries none.
pub const DEFAULT_VIBRATE: [u32; 3] = [200, 100, 200];

/// Inbound push message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub vibrate: Option<Vec<u32>>,
    #[serde(default)]
    pub url: Option<String>,
}

impl PushPayload {
    /// Parse a push message body.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a JSON object of the expected shape.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Resolve defaults. `default_url` is opened when the notification is
    /// clicked and the payload names no URL (normally the app origin).
    #[must_use]
    pub fn into_notification(self, default_url: &str) -> Notification {
        Notification {
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: self.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: self.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            badge: self.badge.unwrap_or_else(|| DEFAULT_BADGE.to_string()),
            vibrate: self.vibrate.unwrap_or_else(|| DEFAULT_VIBRATE.to_vec()),
            url: self.url.unwrap_or_else(|| default_url.to_string()),
        }
    }
}

/// A fully resolved notification ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// Page to focus or open when the notification is clicked.
    pub url: String,
}

impl Notification {
    /// Notification shown right after the user grants permission.
    #[must_use]
    pub fn welcome(url: &str) -> Self {
        Self {
            title: "Welcome to E-Shop PWA!".to_string(),
            body: "You will receive updates on new products and offers!".to_string(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            vibrate: DEFAULT_VIBRATE.to_vec(),
            url: url.to_string(),
        }
    }
}

/// Signal sent to the worker when the user clicks a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationClick {
    /// Target URL carried by the notification; `None` means the app origin.
    pub url: Option<String>,
}
