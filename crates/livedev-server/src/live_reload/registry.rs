//! Live-reload channel registry.
//!
//! Each `/livereload` request registers one handle. A broadcast sends a single
//! reload event to every registered handle and empties the registry, so a
//! connection hears about at most one change. Clients reconnect after
//! reloading the page.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Payload of the SSE `data:` line sent on reload.
pub(crate) const RELOAD_DATA: &str = "update";

/// Reload notification delivered to subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReloadEvent;

/// Registry of open live-reload connections.
#[derive(Debug, Default)]
pub struct LiveReloadRegistry {
    clients: Mutex<Vec<mpsc::UnboundedSender<ReloadEvent>>>,
}

impl LiveReloadRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock().push(sender);
        Subscription { receiver }
    }

    /// Send one reload event to every registered connection, then clear the
    /// registry.
    ///
    /// Returns the number of connections that accepted the event. Sends to
    /// connections that have already gone away are ignored.
    pub fn broadcast(&self) -> usize {
        let clients = std::mem::take(&mut *self.lock());
        let total = clients.len();
        let delivered = clients
            .iter()
            .filter(|client| client.send(ReloadEvent).is_ok())
            .count();

        tracing::debug!(delivered, stale = total - delivered, "Reload broadcast");
        delivered
    }

    /// Number of registered connections, including ones that have since closed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<ReloadEvent>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving side of one registered connection.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<ReloadEvent>,
}

impl Subscription {
    /// Wait for the next reload event.
    ///
    /// Returns `None` once the event for this subscription has been consumed.
    pub async fn recv(&mut self) -> Option<ReloadEvent> {
        self.receiver.recv().await
    }

    /// Take a pending reload event without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] if no broadcast happened yet and
    /// [`TryRecvError::Disconnected`] once the registry dropped this handle.
    pub fn try_recv(&mut self) -> Result<ReloadEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    pub(crate) fn into_receiver(self) -> mpsc::UnboundedReceiver<ReloadEvent> {
        self.receiver
    }
}
