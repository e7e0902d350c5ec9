//! Toasts and the notification permission flow.

use std::str::FromStr;
use std::time::Duration;

use eshop_core::{CartChange, Notification};
use serde::{Deserialize, Serialize};

/// How long a toast stays on screen, in milliseconds.
pub const TOAST_DURATION_MS: u64 = 3000;
/// How long a toast stays on screen.
pub const TOAST_DURATION: Duration = Duration::from_millis(TOAST_DURATION_MS);

/// Toast styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Info,
}

impl ToastKind {
    /// Background colour of the toast.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Success => "hsl(120, 60%, 40%)",
            Self::Info => "hsl(210, 80%, 55%)",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
        }
    }
}

/// A transient message shown at the bottom of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Info,
        }
    }

    /// Toast announcing a cart change.
    #[must_use]
    pub fn for_change(change: &CartChange) -> Self {
        match change {
            CartChange::Added { name, .. } | CartChange::Incremented { name, .. } => {
                Self::success(format!("Added {name} to cart!"))
            }
            CartChange::Removed {
                name, all: true, ..
            } => Self::info(format!("Removed all {name}.")),
            CartChange::Decremented { name, .. } | CartChange::Removed { name, .. } => {
                Self::info(format!("Decreased quantity of {name}."))
            }
        }
    }

    #[must_use]
    pub const fn color(&self) -> &'static str {
        self.kind.color()
    }

    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        TOAST_DURATION_MS
    }
}

impl Serialize for Toast {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Toast", 4)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("color", self.color())?;
        state.serialize_field("duration_ms", &self.duration_ms())?;
        state.end()
    }
}

/// What the browser answered when asked for notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// The prompt was dismissed.
    Default,
    Granted,
    Denied,
    /// The browser has no notification support.
    Unsupported,
}

impl FromStr for NotificationPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "granted" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            "unsupported" => Ok(Self::Unsupported),
            other => Err(format!("unknown notification permission: {other}")),
        }
    }
}

/// Result of the "enable notifications" flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionOutcome {
    pub toast: Toast,
    /// Shown through the offline worker when permission was granted.
    pub notification: Option<Notification>,
}

/// Decide what to show once the permission prompt resolves.
///
/// `origin` is opened when the welcome notification is clicked.
#[must_use]
pub fn enable_notifications(permission: NotificationPermission, origin: &str) -> PermissionOutcome {
    match permission {
        NotificationPermission::Granted => PermissionOutcome {
            toast: Toast::success("Notifications enabled!"),
            notification: Some(Notification::welcome(origin)),
        },
        NotificationPermission::Default | NotificationPermission::Denied => PermissionOutcome {
            toast: Toast::info("Notification permission denied."),
            notification: None,
        },
        NotificationPermission::Unsupported => PermissionOutcome {
            toast: Toast::info("Your browser does not support notifications."),
            notification: None,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use eshop_core::ProductId;

    use super::*;

    fn name() -> String {
        "Smartwatch Pro".to_string()
    }

    #[test]
    fn test_toast_for_change() {
        let id = ProductId::new(2);
        assert_eq!(
            Toast::for_change(&CartChange::Added { id, name: name() }),
            Toast::success("Added Smartwatch Pro to cart!")
        );
        assert_eq!(
            Toast::for_change(&CartChange::Incremented {
                id,
                name: name(),
                quantity: 2
            }),
            Toast::success("Added Smartwatch Pro to cart!")
        );
        assert_eq!(
            Toast::for_change(&CartChange::Decremented {
                id,
                name: name(),
                quantity: 1
            }),
            Toast::info("Decreased quantity of Smartwatch Pro.")
        );
        assert_eq!(
            Toast::for_change(&CartChange::Removed {
                id,
                name: name(),
                all: false
            }),
            Toast::info("Decreased quantity of Smartwatch Pro.")
        );
        assert_eq!(
            Toast::for_change(&CartChange::Removed {
                id,
                name: name(),
                all: true
            }),
            Toast::info("Removed all Smartwatch Pro.")
        );
    }

    #[test]
    fn test_toast_serializes_presentation() {
        let json = serde_json::to_value(Toast::success("Done")).unwrap();
        assert_eq!(json["kind"], "success");
        assert_eq!(json["color"], "hsl(120, 60%, 40%)");
        assert_eq!(json["duration_ms"], 3000);
    }

    #[test]
    fn test_permission_granted_sends_welcome() {
        let outcome = enable_notifications(NotificationPermission::Granted, "https://shop.example");
        assert_eq!(outcome.toast, Toast::success("Notifications enabled!"));
        let notification = outcome.notification.unwrap();
        assert_eq!(notification.title, "Welcome to E-Shop PWA!");
        assert_eq!(notification.url, "https://shop.example");
    }

    #[test]
    fn test_permission_refused() {
        for permission in [NotificationPermission::Denied, NotificationPermission::Default] {
            let outcome = enable_notifications(permission, "https://shop.example");
            assert_eq!(outcome.toast, Toast::info("Notification permission denied."));
            assert!(outcome.notification.is_none());
        }

        let outcome = enable_notifications(NotificationPermission::Unsupported, "");
        assert_eq!(
            outcome.toast.message,
            "Your browser does not support notifications."
        );
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!(
            "granted".parse::<NotificationPermission>().unwrap(),
            NotificationPermission::Granted
        );
        assert!("maybe".parse::<NotificationPermission>().is_err());
    }
}
