//! Wire format for the dashboard realtime stream.
//!
//! Every frame, in both directions, is a UTF-8 JSON text message carrying
//! one envelope `{"type": string, "data": any}`.

use drongo_common::RealtimeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event type names carried in the envelope `type` field.
pub mod events {
    // Server -> client
    pub const STATS_UPDATE: &str = "stats_update";
    pub const MESSAGE_ACTIVITY: &str = "message_activity";
    pub const DATABASE_HEALTH: &str = "database_health";
    pub const BOT_STATUS: &str = "bot_status";
    pub const RECENT_ACTIVITY: &str = "recent_activity";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";

    // Client -> server
    pub const PING: &str = "ping";
    pub const REQUEST_UPDATE: &str = "request_update";

    /// Synthetic event emitted locally on every connection state change.
    pub const CONNECTION_STATE_CHANGED: &str = "connection_state_changed";

    /// Every event type the server is known to push.
    pub const SERVER_EVENTS: [&str; 7] = [
        STATS_UPDATE,
        MESSAGE_ACTIVITY,
        DATABASE_HEALTH,
        BOT_STATUS,
        RECENT_ACTIVITY,
        PONG,
        ERROR,
    ];
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// An inbound frame decoded once and dispatched by `kind`.
///
/// `data` is `null` when the server omits it. Some server frames put their
/// payload at the top level instead (`{"type":"error","message":...}`);
/// those fields land in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Look up a field in `data` first, then among the top-level extras.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).or_else(|| self.extra.get(name))
    }
}

#[derive(Serialize)]
struct Outbound<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
}

/// Serialize an outbound envelope. The `data` key is omitted when `None`.
pub fn encode_message(kind: &str, data: Option<&Value>) -> Result<String, RealtimeError> {
    Ok(serde_json::to_string(&Outbound { kind, data })?)
}
