//! Realtime client for the Drongo dashboard WebSocket stream.
//!
//! The dashboard server pushes JSON frames of the form `{"type", "data"}`
//! over `/ws`. [`RealtimeClient`] owns the connection, fans frames out to
//! listeners registered per event type, and reconnects with linear backoff.

pub mod payloads;
pub mod protocol;
pub mod realtime;
pub mod server_event;

pub use payloads::{
    DashboardStats, DatabaseHealth, GuildStats, MessageActivity, RecentActivity, RecentEvent,
    RecentMessage, SystemDatabase,
};
pub use protocol::{encode_message, events, Envelope};
pub use realtime::{
    ConnectionState, EventHandler, Handler, ListenerRegistry, RealtimeClient, RealtimeConfig,
    ReconnectPolicy,
};
pub use server_event::{ClientEvent, ServerEvent};
