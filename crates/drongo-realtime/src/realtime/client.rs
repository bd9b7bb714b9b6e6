//! Public handle for the dashboard realtime connection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use drongo_common::RealtimeError;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::{connection_loop, Shared};
use super::listeners::{EventHandler, Handler};
use super::types::{ConnectionState, RealtimeConfig};
use crate::protocol::encode_message;
use crate::server_event::ClientEvent;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for the dashboard realtime connection.
///
/// Cloning is cheap; every clone drives the same connection and listener
/// registry. Construct one at the application root and hand clones to
/// whoever needs to subscribe. All methods are non-blocking.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: RealtimeConfig,
    url: String,
    shared: Arc<Shared>,
    /// Cancels the current connection task, if any.
    task: Mutex<Option<CancellationToken>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(cancel) = self.task.get_mut().ok().and_then(Option::take) {
            cancel.cancel();
        }
    }
}

impl RealtimeClient {
    /// Create a client. Nothing connects until [`connect`](Self::connect).
    pub fn new(config: RealtimeConfig) -> Result<Self, RealtimeError> {
        let url = config.ws_url()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                url,
                shared: Arc::new(Shared::new()),
                task: Mutex::new(None),
            }),
        })
    }

    /// The `ws://` or `wss://` URL this client connects to.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    fn task(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.inner.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the connection in a background task.
    ///
    /// Replaces any connection or pending reconnect started by an earlier
    /// call, so at most one socket is live. Outside a Tokio runtime this
    /// logs a warning and does nothing.
    pub fn connect(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("connect() called outside a Tokio runtime, ignoring");
            return;
        };

        let epoch = self.inner.shared.next_epoch();
        let cancel = CancellationToken::new();
        let previous = self.task().replace(cancel.clone());
        if let Some(previous) = previous {
            debug!("Replacing previous realtime connection");
            previous.cancel();
        }

        runtime.spawn(connection_loop(
            self.inner.config.clone(),
            self.inner.url.clone(),
            Arc::clone(&self.inner.shared),
            epoch,
            cancel,
        ));
    }

    /// Close the connection and cancel any pending reconnect.
    ///
    /// Listeners stay registered; a later `connect()` reuses them.
    pub fn disconnect(&self) {
        let Some(cancel) = self.task().take() else {
            return;
        };
        info!("Disconnecting from dashboard realtime");
        cancel.cancel();
        self.inner.shared.supersede(ConnectionState::Closed, 0);
    }

    /// Register `handler` for `event_type`. Registering the same handle
    /// twice has no effect.
    pub fn on(&self, event_type: &str, handler: Handler) {
        self.inner.shared.listeners.insert(event_type, handler);
    }

    /// Remove `handler` from `event_type`. Unknown handlers are ignored.
    pub fn off(&self, event_type: &str, handler: &Handler) {
        self.inner.shared.listeners.remove(event_type, handler);
    }

    /// Register a listener that receives the parsed [`ServerEvent`](crate::ServerEvent).
    /// Frames whose payload fails validation are not delivered to it.
    pub fn on_event(&self, event_type: &str, handler: EventHandler) {
        self.inner.shared.typed.insert(event_type, handler);
    }

    pub fn off_event(&self, event_type: &str, handler: &EventHandler) {
        self.inner.shared.typed.remove(event_type, handler);
    }

    /// Send `{"type": event_type, "data": data}` if the socket is open.
    ///
    /// Fire-and-forget: while not open the message is dropped, never queued.
    pub fn send(&self, event_type: &str, data: Option<Value>) {
        let state = self.state();
        if !state.is_open() {
            debug!(event = %event_type, state = %state, "Dropping send while not open");
            return;
        }

        let frame = match encode_message(event_type, data.as_ref()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(event = %event_type, error = %e, "Failed to encode outbound message");
                return;
            }
        };

        if !self.inner.shared.enqueue(frame) {
            debug!(event = %event_type, "Socket closed before send");
        }
    }

    pub fn send_event(&self, event: ClientEvent) {
        self.send(event.kind(), None);
    }

    /// Heartbeat; the server replies with `pong`.
    pub fn ping(&self) {
        self.send_event(ClientEvent::Ping);
    }

    /// Ask the server for an immediate stats push.
    pub fn request_update(&self) {
        self.send_event(ClientEvent::RequestUpdate);
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.state()
    }

    /// Subscribe to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.shared.state_tx.subscribe()
    }

    /// Number of raw listeners registered for `event_type`.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.inner.shared.listeners.count(event_type)
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Shared {
        &self.inner.shared
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .finish()
    }
}
