//! Typed view over inbound envelopes.
//!
//! [`ServerEvent::from_envelope`] is the single validation boundary: a known
//! event type with a malformed payload is rejected here instead of reaching
//! subscribers half-parsed. Unrecognized types map to `Unknown` so the server
//! can add new pushes without breaking older clients.

use drongo_common::EventError;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::payloads::{DashboardStats, DatabaseHealth, MessageActivity, RecentActivity};
use crate::protocol::{events, Envelope};

/// An event pushed by the dashboard server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    StatsUpdate(Box<DashboardStats>),
    MessageActivity(MessageActivity),
    DatabaseHealth(DatabaseHealth),
    BotStatus { status: String },
    RecentActivity(RecentActivity),
    Pong,
    Error { message: String },
    Unknown { kind: String },
}

impl ServerEvent {
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, EventError> {
        let kind = envelope.kind.as_str();
        let event = match kind {
            events::STATS_UPDATE => Self::StatsUpdate(Box::new(payload(kind, &envelope.data)?)),
            events::MESSAGE_ACTIVITY => Self::MessageActivity(payload(kind, &envelope.data)?),
            events::DATABASE_HEALTH => Self::DatabaseHealth(payload(kind, &envelope.data)?),
            events::RECENT_ACTIVITY => Self::RecentActivity(payload(kind, &envelope.data)?),
            events::BOT_STATUS => Self::BotStatus {
                status: text_field(envelope, "status")
                    .ok_or_else(|| invalid(kind, "missing 'status'"))?,
            },
            events::PONG => Self::Pong,
            events::ERROR => Self::Error {
                message: text_field(envelope, "message")
                    .unwrap_or_else(|| "unknown error".to_string()),
            },
            other => Self::Unknown {
                kind: other.to_string(),
            },
        };
        Ok(event)
    }

    /// The envelope `type` this event was parsed from.
    pub fn kind(&self) -> &str {
        match self {
            Self::StatsUpdate(_) => events::STATS_UPDATE,
            Self::MessageActivity(_) => events::MESSAGE_ACTIVITY,
            Self::DatabaseHealth(_) => events::DATABASE_HEALTH,
            Self::BotStatus { .. } => events::BOT_STATUS,
            Self::RecentActivity(_) => events::RECENT_ACTIVITY,
            Self::Pong => events::PONG,
            Self::Error { .. } => events::ERROR,
            Self::Unknown { kind } => kind,
        }
    }
}

fn payload<T: DeserializeOwned>(kind: &str, data: &Value) -> Result<T, EventError> {
    // A server that sends no payload at all gets the defaults.
    if data.is_null() {
        return serde_json::from_value(Value::Object(Default::default()))
            .map_err(|e| invalid(kind, &e.to_string()));
    }
    T::deserialize(data).map_err(|e| invalid(kind, &e.to_string()))
}

/// `status`/`message` arrive either inside `data`, at the top level, or as
/// a bare string in `data`.
fn text_field(envelope: &Envelope, name: &str) -> Option<String> {
    envelope
        .field(name)
        .or_else(|| envelope.data.is_string().then_some(&envelope.data))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn invalid(kind: &str, reason: &str) -> EventError {
    EventError::InvalidPayload {
        kind: kind.to_string(),
        reason: reason.to_string(),
    }
}

/// Messages the client sends to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// Heartbeat; the server answers with `pong`.
    Ping,
    /// Ask the server for an immediate stats push.
    RequestUpdate,
}

impl ClientEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping => events::PING,
            Self::RequestUpdate => events::REQUEST_UPDATE,
        }
    }
}
