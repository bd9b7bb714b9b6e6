//! Configuration and connection-state types for the realtime client.

use std::time::Duration;

use drongo_common::RealtimeError;
use drongo_config::RealtimeSettings;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to the dashboard stream.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// HTTP origin of the hosting dashboard, e.g. `https://dash.example.org`.
    pub origin: String,
    /// Reconnect attempts after a drop before the client gives up.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay; attempt `n` waits `n * reconnect_delay`.
    pub reconnect_delay: Duration,
    /// Interval between `ping` frames while open. `None` disables it.
    pub heartbeat_interval: Option<Duration>,
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        RealtimeConfig::from(&RealtimeSettings::default())
    }
}

impl From<&RealtimeSettings> for RealtimeConfig {
    fn from(settings: &RealtimeSettings) -> Self {
        Self {
            origin: settings.origin.clone(),
            max_reconnect_attempts: settings.max_reconnect_attempts,
            reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
            heartbeat_interval: (settings.heartbeat_interval_secs > 0)
                .then(|| Duration::from_secs(settings.heartbeat_interval_secs)),
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
        }
    }
}

impl RealtimeConfig {
    /// Build the WebSocket URL for the dashboard stream.
    pub fn ws_url(&self) -> Result<String, RealtimeError> {
        ws_url_for_origin(&self.origin)
    }
}

/// Map an HTTP origin to its `/ws` endpoint (`http` -> `ws`, `https` -> `wss`).
///
/// Only the host (and port) of the origin is kept; any path is dropped.
pub fn ws_url_for_origin(origin: &str) -> Result<String, RealtimeError> {
    let trimmed = origin.trim();
    let (scheme, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        ("ws", rest)
    } else {
        return Err(RealtimeError::InvalidOrigin(origin.to_string()));
    };

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(RealtimeError::InvalidOrigin(origin.to_string()));
    }

    Ok(format!("{scheme}://{host}/ws"))
}

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Lifecycle of the client's connection.
///
/// `Idle -> Connecting -> Open -> Closed -> (Reconnecting -> Connecting)* -> Exhausted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    /// Opening a socket.
    Connecting,
    /// Socket open; frames flow both ways.
    Open,
    /// Socket gone. Either a reconnect is about to be scheduled or the
    /// client was disconnected on purpose.
    Closed,
    /// Waiting out the backoff delay before the next attempt.
    Reconnecting,
    /// Reconnect attempts used up. Only an explicit `connect()` leaves this.
    Exhausted,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Reconnecting => "reconnecting",
            Self::Exhausted => "exhausted",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
