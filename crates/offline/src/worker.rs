//! The offline worker task.
//!
//! The worker runs in its own task and only talks to the rest of the process
//! through channels: [`WorkerEvent`]s come in through an
//! [`OfflineWorkerHandle`], and [`ClientCommand`]s go out to whoever drives
//! the page windows. Fetch events are answered concurrently; lifecycle, push
//! and client events are handled in arrival order.

use bytes::Bytes;
use eshop_core::NotificationClick;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

use crate::clients::{ClientCommand, WindowClient, WindowClients};
use crate::error::{InstallError, WorkerError};
use crate::lifecycle::WorkerState;
use crate::manager::CacheManager;
use crate::network::Network;
use crate::request::{FetchResult, Request};
use crate::storage::CacheStorage;

const EVENT_BUFFER: usize = 1024;

/// Event delivered to the worker.
#[derive(Debug)]
pub enum WorkerEvent {
    Install {
        respond_to: oneshot::Sender<Result<(), InstallError>>,
    },
    Activate {
        respond_to: oneshot::Sender<Result<Vec<String>, WorkerError>>,
    },
    Fetch {
        request: Request,
        respond_to: oneshot::Sender<FetchResult>,
    },
    Push {
        data: Bytes,
    },
    NotificationClick {
        click: NotificationClick,
    },
    ClientConnected {
        url: String,
        respond_to: oneshot::Sender<Uuid>,
    },
    ClientDisconnected {
        id: Uuid,
    },
    ListClients {
        respond_to: oneshot::Sender<Vec<WindowClient>>,
    },
    /// Stop accepting events; in-flight fetches are still answered.
    Shutdown,
}

/// Spawns the worker task.
pub struct OfflineWorker;

impl OfflineWorker {
    /// Start the worker on the current runtime.
    ///
    /// Returns the handle used to send events, the stream of commands for
    /// page windows, and the task handle. The task ends once every handle
    /// is dropped and in-flight fetches have been answered.
    #[must_use]
    pub fn spawn<S: CacheStorage, N: Network>(
        manager: CacheManager<S, N>,
    ) -> (
        OfflineWorkerHandle,
        mpsc::UnboundedReceiver<ClientCommand>,
        JoinHandle<()>,
    ) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let handle = OfflineWorkerHandle {
            events: events_tx,
            state: manager.subscribe(),
        };
        let task = tokio::spawn(run(manager, events_rx, commands_tx));
        (handle, commands_rx, task)
    }
}

async fn run<S: CacheStorage, N: Network>(
    manager: CacheManager<S, N>,
    mut events: mpsc::Receiver<WorkerEvent>,
    commands: mpsc::UnboundedSender<ClientCommand>,
) {
    let mut clients = WindowClients::new();
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if matches!(event, WorkerEvent::Shutdown) {
                    tracing::info!(in_flight = in_flight.len(), "Offline worker shutting down");
                    break;
                }
                handle_event(&manager, event, &mut clients, &mut in_flight, &commands).await;
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Fetch handler failed");
                }
            }
        }
    }

    events.close();
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Fetch handler failed");
        }
    }
    tracing::info!("Offline worker stopped");
}

async fn handle_event<S: CacheStorage, N: Network>(
    manager: &CacheManager<S, N>,
    event: WorkerEvent,
    clients: &mut WindowClients,
    in_flight: &mut JoinSet<()>,
    commands: &mpsc::UnboundedSender<ClientCommand>,
) {
    match event {
        WorkerEvent::Install { respond_to } => {
            let _ = respond_to.send(manager.install().await);
        }
        WorkerEvent::Activate { respond_to } => {
            let _ = respond_to.send(manager.activate().await);
        }
        WorkerEvent::Fetch {
            request,
            respond_to,
        } => {
            let manager = manager.clone();
            in_flight.spawn(async move {
                let result = manager.handle_fetch(request).await;
                // The page may have gone away; nothing to do then.
                let _ = respond_to.send(result);
            });
        }
        WorkerEvent::Push { data } => match manager.push(&data) {
            Ok(notification) => send_command(commands, ClientCommand::ShowNotification(notification)),
            Err(e) => tracing::warn!(error = %e, "Ignoring malformed push message"),
        },
        WorkerEvent::NotificationClick { click } => {
            let command = manager.notification_click(click, clients);
            send_command(commands, command);
        }
        WorkerEvent::ClientConnected { url, respond_to } => {
            let id = clients.register(url);
            tracing::debug!(client = %id, "Client connected");
            let _ = respond_to.send(id);
        }
        WorkerEvent::ClientDisconnected { id } => {
            if clients.unregister(id) {
                tracing::debug!(client = %id, "Client disconnected");
            }
        }
        WorkerEvent::ListClients { respond_to } => {
            let _ = respond_to.send(clients.match_all().to_vec());
        }
        WorkerEvent::Shutdown => {}
    }
}

fn send_command(commands: &mpsc::UnboundedSender<ClientCommand>, command: ClientCommand) {
    if commands.send(command).is_err() {
        tracing::warn!("No page listening for client commands");
    }
}

/// Cheaply cloneable handle to a running worker.
#[derive(Clone)]
pub struct OfflineWorkerHandle {
    events: mpsc::Sender<WorkerEvent>,
    state: watch::Receiver<WorkerState>,
}

impl OfflineWorkerHandle {
    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    async fn send(&self, event: WorkerEvent) -> Result<(), WorkerError> {
        self.events
            .send(event)
            .await
            .map_err(|_| WorkerError::Closed)
    }

    async fn request<T>(
        &self,
        event: impl FnOnce(oneshot::Sender<T>) -> WorkerEvent,
    ) -> Result<T, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.send(event(tx)).await?;
        rx.await.map_err(|_| WorkerError::Closed)
    }

    /// Run the install phase.
    ///
    /// # Errors
    ///
    /// Returns an error if install fails or the worker has stopped.
    pub async fn install(&self) -> Result<(), WorkerError> {
        self.request(|respond_to| WorkerEvent::Install { respond_to })
            .await?
            .map_err(WorkerError::from)
    }

    /// Run the activate phase. Returns the names of deleted buckets.
    ///
    /// # Errors
    ///
    /// Returns an error if activation fails or the worker has stopped.
    pub async fn activate(&self) -> Result<Vec<String>, WorkerError> {
        self.request(|respond_to| WorkerEvent::Activate { respond_to })
            .await?
    }

    /// Route a page request through the worker.
    ///
    /// # Errors
    ///
    /// Returns an error only if the worker has stopped.
    pub async fn fetch(&self, request: Request) -> Result<FetchResult, WorkerError> {
        self.request(|respond_to| WorkerEvent::Fetch {
            request,
            respond_to,
        })
        .await
    }

    /// Deliver a push message.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has stopped.
    pub async fn push(&self, data: Bytes) -> Result<(), WorkerError> {
        self.send(WorkerEvent::Push { data }).await
    }

    /// Report a notification click.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has stopped.
    pub async fn notification_click(&self, click: NotificationClick) -> Result<(), WorkerError> {
        self.send(WorkerEvent::NotificationClick { click }).await
    }

    /// Announce a page window at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has stopped.
    pub async fn connect_client(&self, url: impl Into<String>) -> Result<Uuid, WorkerError> {
        let url = url.into();
        self.request(|respond_to| WorkerEvent::ClientConnected { url, respond_to })
            .await
    }

    /// Announce that a page window closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has stopped.
    pub async fn disconnect_client(&self, id: Uuid) -> Result<(), WorkerError> {
        self.send(WorkerEvent::ClientDisconnected { id }).await
    }

    /// Ask the worker to stop once in-flight fetches are answered.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has already stopped.
    pub async fn shutdown(&self) -> Result<(), WorkerError> {
        self.send(WorkerEvent::Shutdown).await
    }

    /// Windows currently known to the worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has stopped.
    pub async fn clients(&self) -> Result<Vec<WindowClient>, WorkerError> {
        self.request(|respond_to| WorkerEvent::ListClients { respond_to })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::manager::CacheSettings;
    use crate::manifest::ShellManifest;
    use crate::request::FetchSource;
    use crate::storage::MemoryCacheStorage;
    use crate::testing::ScriptedNetwork;

    const ORIGIN: &str = "https://shop.example";

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    fn spawn_worker() -> (
        OfflineWorkerHandle,
        mpsc::UnboundedReceiver<ClientCommand>,
        JoinHandle<()>,
        ScriptedNetwork,
    ) {
        let settings = CacheSettings::new(Url::parse(ORIGIN).unwrap(), vec![])
            .unwrap()
            .with_manifest(ShellManifest::new(vec![url("/index.html")]));
        let network = ScriptedNetwork::new(settings.policy.clone());
        network.ok(&url("/index.html"), "<html>shell</html>");
        let manager = CacheManager::new(MemoryCacheStorage::new(), network.clone(), settings);
        let (handle, commands, task) = OfflineWorker::spawn(manager);
        (handle, commands, task, network)
    }

    #[tokio::test]
    async fn test_lifecycle_through_handle() {
        let (worker, _commands, _task, network) = spawn_worker();
        assert_eq!(worker.state(), WorkerState::Parsed);

        worker.install().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Installed);
        worker.activate().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Activated);

        network.set_offline(true);
        let result = worker.fetch(Request::navigate(url("/"))).await.unwrap();
        assert_eq!(result.source, FetchSource::ShellFallback);
    }

    #[tokio::test]
    async fn test_concurrent_fetches() {
        let (worker, _commands, _task, network) = spawn_worker();
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        network.ok(&url("/a.css"), "a");
        network.ok(&url("/b.css"), "b");

        let (a, b) = tokio::join!(
            worker.fetch(Request::get(url("/a.css"))),
            worker.fetch(Request::get(url("/b.css")))
        );
        assert_eq!(a.unwrap().response.body().as_ref(), b"a");
        assert_eq!(b.unwrap().response.body().as_ref(), b"b");
    }

    #[tokio::test]
    async fn test_push_emits_notification() {
        let (worker, mut commands, _task, _) = spawn_worker();
        worker
            .push(Bytes::from_static(br#"{"title":"Flash sale"}"#))
            .await
            .unwrap();

        match commands.recv().await.unwrap() {
            ClientCommand::ShowNotification(notification) => {
                assert_eq!(notification.title, "Flash sale");
                assert_eq!(notification.url, ORIGIN);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_push_is_ignored() {
        let (worker, mut commands, _task, _) = spawn_worker();
        worker.push(Bytes::from_static(b"not json")).await.unwrap();
        worker.push(Bytes::from_static(b"{}")).await.unwrap();

        // Only the valid message produces a command.
        match commands.recv().await.unwrap() {
            ClientCommand::ShowNotification(notification) => {
                assert_eq!(notification.title, eshop_core::notification::DEFAULT_TITLE);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_notification_click_focuses_connected_client() {
        let (worker, mut commands, _task, _) = spawn_worker();
        let cart_url = format!("{ORIGIN}/?section=cart");
        let id = worker.connect_client(cart_url.clone()).await.unwrap();

        worker
            .notification_click(NotificationClick {
                url: Some(cart_url.clone()),
            })
            .await
            .unwrap();
        assert_eq!(
            commands.recv().await.unwrap(),
            ClientCommand::Focus {
                client_id: id,
                url: cart_url,
            }
        );

        worker.disconnect_client(id).await.unwrap();
        worker
            .notification_click(NotificationClick { url: None })
            .await
            .unwrap();
        assert!(matches!(
            commands.recv().await.unwrap(),
            ClientCommand::OpenWindow { .. }
        ));
        assert_eq!(worker.clients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_answers_in_flight_fetch() {
        let (worker, _commands, task, network) = spawn_worker();
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        network.ok(&url("/late.css"), "late");

        let pending = {
            let worker = worker.clone();
            tokio::spawn(async move { worker.fetch(Request::get(url("/late.css"))).await })
        };
        tokio::task::yield_now().await;
        worker.shutdown().await.unwrap();
        task.await.unwrap();

        // The fetch either ran before shutdown or was never accepted.
        match pending.await.unwrap() {
            Ok(result) => assert_eq!(result.response.body().as_ref(), b"late"),
            Err(e) => assert!(matches!(e, WorkerError::Closed)),
        }
        assert!(matches!(
            worker.fetch(Request::get(url("/late.css"))).await,
            Err(WorkerError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_task_ends_when_handles_dropped() {
        let (worker, _commands, task, _) = spawn_worker();
        worker.install().await.unwrap();
        drop(worker);
        task.await.unwrap();
    }
}
