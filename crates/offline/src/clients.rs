//! Window clients controlled by the worker.
//!
//! The worker never touches a page directly. It keeps a registry of the
//! windows that announced themselves and emits [`ClientCommand`]s for the
//! page side to carry out.

use eshop_core::Notification;
use serde::Serialize;
use uuid::Uuid;

/// A page window known to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowClient {
    pub id: Uuid,
    pub url: String,
    pub focused: bool,
}

/// Command sent from the worker to the page side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Display an OS-level notification.
    ShowNotification(Notification),
    /// Bring an existing window to the front.
    Focus { client_id: Uuid, url: String },
    /// Open a new window at `url`.
    OpenWindow { client_id: Uuid, url: String },
}

/// Registry of open windows, in the order they connected.
#[derive(Debug, Default)]
pub struct WindowClients {
    clients: Vec<WindowClient>,
}

impl WindowClients {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened window.
    pub fn register(&mut self, url: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.clients.push(WindowClient {
            id,
            url: url.into(),
            focused: false,
        });
        id
    }

    /// Forget a closed window. Returns `false` if it was unknown.
    pub fn unregister(&mut self, id: Uuid) -> bool {
        let before = self.clients.len();
        self.clients.retain(|client| client.id != id);
        self.clients.len() != before
    }

    /// All known windows.
    #[must_use]
    pub fn match_all(&self) -> &[WindowClient] {
        &self.clients
    }

    /// Focus the first window showing exactly `url`, or open a new one.
    pub fn focus_or_open(&mut self, url: &str) -> ClientCommand {
        let target = self.clients.iter().position(|client| client.url == url);
        for client in &mut self.clients {
            client.focused = false;
        }

        if let Some(client) = target.and_then(|index| self.clients.get_mut(index)) {
            client.focused = true;
            return ClientCommand::Focus {
                client_id: client.id,
                url: client.url.clone(),
            };
        }

        let client_id = Uuid::new_v4();
        self.clients.push(WindowClient {
            id: client_id,
            url: url.to_string(),
            focused: true,
        });
        ClientCommand::OpenWindow {
            client_id,
            url: url.to_string(),
        }
    }
}
