//! WebSocket client for the dashboard's `/ws` stream.
//!
//! Built on `tokio-tungstenite`. One background task per `connect()` owns
//! the socket, the heartbeat and the reconnect timer; public calls reach it
//! through shared state and an outbound frame channel.

mod backoff;
mod client;
mod connection;
mod handler;
mod listeners;
mod types;

#[cfg(test)]
mod tests;

pub use backoff::ReconnectPolicy;
pub use client::RealtimeClient;
pub use listeners::{EventHandler, Handler, Listener, ListenerRegistry};
pub use types::{ws_url_for_origin, ConnectionState, RealtimeConfig};
