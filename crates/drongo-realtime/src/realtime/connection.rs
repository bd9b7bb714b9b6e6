//! Background WebSocket connection loop with linear-backoff reconnect.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::ReconnectPolicy;
use super::handler::{dispatch, handle_text};
use super::listeners::ListenerRegistry;
use super::types::{ConnectionState, RealtimeConfig};
use crate::protocol::{encode_message, events};
use crate::server_event::ServerEvent;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Which connection task is current, and its writer.
struct Gate {
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

/// State shared between the public handle and the connection task.
///
/// `connect()` and `disconnect()` bump the epoch. A task may only change the
/// state or the writer while its epoch is current, and that check happens
/// under the same lock as the bump, so a superseded task can never overwrite
/// what `disconnect()` wrote.
pub(crate) struct Shared {
    pub(crate) listeners: ListenerRegistry<Value>,
    pub(crate) typed: ListenerRegistry<ServerEvent>,
    pub(crate) state_tx: watch::Sender<ConnectionState>,
    gate: Mutex<Gate>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            listeners: ListenerRegistry::new(),
            typed: ListenerRegistry::new(),
            state_tx,
            gate: Mutex::new(Gate {
                epoch: 0,
                outbound: None,
            }),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new epoch, detaching whichever task owned the previous one.
    pub(crate) fn next_epoch(&self) -> u64 {
        let mut gate = self.gate();
        gate.epoch += 1;
        gate.outbound = None;
        gate.epoch
    }

    /// Detach the current task and move to `state` in one step.
    pub(crate) fn supersede(&self, state: ConnectionState, attempt: u32) {
        let changed = {
            let mut gate = self.gate();
            gate.epoch += 1;
            gate.outbound = None;
            self.set_state(state)
        };
        if changed {
            self.notify(state, attempt);
        }
    }

    /// Queue a frame on the open socket. Returns `false` if there is none.
    pub(crate) fn enqueue(&self, frame: String) -> bool {
        match self.gate().outbound.as_ref() {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }

    pub(crate) fn install_outbound(&self, epoch: u64, tx: mpsc::UnboundedSender<String>) {
        let mut gate = self.gate();
        if gate.epoch == epoch {
            gate.outbound = Some(tx);
        }
    }

    fn clear_outbound(&self, epoch: u64) {
        let mut gate = self.gate();
        if gate.epoch == epoch {
            gate.outbound = None;
        }
    }

    fn set_state(&self, state: ConnectionState) -> bool {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        })
    }

    /// Listeners run after the lock is released, so they may call back into
    /// the client.
    fn notify(&self, state: ConnectionState, attempt: u32) {
        debug!(state = %state, attempt, "Connection state changed");
        let data = json!({ "state": state, "attempt": attempt });
        dispatch(&self.listeners, events::CONNECTION_STATE_CHANGED, &data);
    }

    /// Move to `state` and notify `connection_state_changed` listeners,
    /// unless `epoch` has been superseded.
    pub(crate) fn transition_if_current(&self, epoch: u64, state: ConnectionState, attempt: u32) {
        let changed = {
            let gate = self.gate();
            gate.epoch == epoch && self.set_state(state)
        };
        if changed {
            self.notify(state, attempt);
        }
    }
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

enum SessionEnd {
    /// Socket closed or failed; fall through to backoff.
    Dropped,
    /// `disconnect()` or a newer `connect()` took over.
    Cancelled,
}

/// Background task owning one logical connection and its reconnects.
pub(crate) async fn connection_loop(
    config: RealtimeConfig,
    url: String,
    shared: Arc<Shared>,
    epoch: u64,
    cancel: CancellationToken,
) {
    let mut policy = ReconnectPolicy::new(config.max_reconnect_attempts, config.reconnect_delay);

    loop {
        shared.transition_if_current(epoch, ConnectionState::Connecting, policy.attempts());
        info!(url = %url, attempt = policy.attempts(), "Connecting to dashboard realtime");

        let attempt = tokio::time::timeout(
            config.connect_timeout,
            tokio_tungstenite::connect_async(url.as_str()),
        );
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            outcome = attempt => outcome,
        };

        match outcome {
            Ok(Ok((ws_stream, _))) => {
                policy.reset();
                if let SessionEnd::Cancelled =
                    run_session(ws_stream, &config, &shared, epoch, &cancel).await
                {
                    return;
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to connect to dashboard realtime");
            }
            Err(_elapsed) => {
                warn!(
                    timeout_secs = config.connect_timeout.as_secs(),
                    "Dashboard realtime connection timed out"
                );
            }
        }

        shared.transition_if_current(epoch, ConnectionState::Closed, policy.attempts());

        let Some(delay) = policy.next_delay() else {
            warn!(
                attempts = policy.attempts(),
                "Reconnect attempts exhausted, giving up until connect() is called"
            );
            shared.transition_if_current(epoch, ConnectionState::Exhausted, policy.attempts());
            return;
        };

        shared.transition_if_current(epoch, ConnectionState::Reconnecting, policy.attempts());
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = policy.attempts(),
            "Reconnecting to dashboard realtime"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Drive one open socket until it drops or the task is cancelled.
async fn run_session(
    ws_stream: WsStream,
    config: &RealtimeConfig,
    shared: &Shared,
    epoch: u64,
    cancel: &CancellationToken,
) -> SessionEnd {
    let (mut ws_write, mut ws_read) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    shared.install_outbound(epoch, out_tx);
    shared.transition_if_current(epoch, ConnectionState::Open, 0);
    info!("Dashboard realtime connected");

    let mut heartbeat = config.heartbeat_interval.map(heartbeat_interval);

    let end = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws_write.send(WsMessage::Close(None)).await;
                break SessionEnd::Cancelled;
            }
            frame = ws_read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    handle_text(&shared.listeners, &shared.typed, text.as_str());
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    info!(frame = ?frame, "Dashboard closed realtime connection");
                    break SessionEnd::Dropped;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    break SessionEnd::Dropped;
                }
                None => {
                    info!("Dashboard realtime stream ended");
                    break SessionEnd::Dropped;
                }
            },
            Some(frame) = out_rx.recv() => {
                if let Err(e) = ws_write.send(WsMessage::Text(frame.into())).await {
                    warn!(error = %e, "Failed to write frame");
                    break SessionEnd::Dropped;
                }
            }
            _ = tick(&mut heartbeat) => {
                if let Ok(ping) = encode_message(events::PING, None) {
                    if let Err(e) = ws_write.send(WsMessage::Text(ping.into())).await {
                        warn!(error = %e, "Failed to send heartbeat");
                        break SessionEnd::Dropped;
                    }
                }
            }
        }
    };

    shared.clear_outbound(epoch);
    end
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

fn heartbeat_interval(period: Duration) -> Interval {
    // First ping one full period after open, not immediately.
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
