//! Realtime connection configuration types.

use serde::{Deserialize, Serialize};

/// Connection settings for the dashboard WebSocket stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RealtimeSettings {
    /// HTTP origin of the dashboard server. The socket URL is derived from it.
    pub origin: String,
    /// Reconnect attempts after a drop before giving up.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay in milliseconds, multiplied by the attempt number.
    pub reconnect_delay_ms: u64,
    /// Seconds between `ping` frames while open. `0` disables the heartbeat.
    pub heartbeat_interval_secs: u64,
    /// Upper bound on a single connection attempt.
    pub connect_timeout_secs: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            origin: "http://localhost:5001".into(),
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 2000,
            heartbeat_interval_secs: 30,
            connect_timeout_secs: 15,
        }
    }
}
