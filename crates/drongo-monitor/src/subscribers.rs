//! Listeners that turn dashboard pushes into log lines.

use std::sync::Arc;

use drongo_realtime::{events, EventHandler, Handler, RealtimeClient, ServerEvent};
use serde_json::Value;

/// One-line summary of a server event.
pub fn describe(event: &ServerEvent) -> String {
    match event {
        ServerEvent::StatsUpdate(stats) => format!(
            "status={} users={} guilds={} messages={} commands={} cpu={:.1}% mem={:.1}MB",
            stats.status,
            stats.active_users,
            stats.bot_guilds,
            stats.messages_processed,
            stats.commands_executed,
            stats.cpu_usage,
            stats.memory_usage,
        ),
        ServerEvent::MessageActivity(activity) => format!(
            "{} buckets, {} messages",
            activity.timestamps.len(),
            activity.message_counts.iter().sum::<u64>()
        ),
        ServerEvent::DatabaseHealth(health) => format!(
            "{:.2}MB across {} tables, {} system databases",
            health.database_size_mb,
            health.table_count,
            health.system_databases.len()
        ),
        ServerEvent::BotStatus { status } => format!("bot is {status}"),
        ServerEvent::RecentActivity(activity) => format!(
            "{} messages, {} events",
            activity.recent_messages.len(),
            activity.recent_events.len()
        ),
        ServerEvent::Pong => "pong".to_string(),
        ServerEvent::Error { message } => format!("server error: {message}"),
        ServerEvent::Unknown { kind } => format!("unrecognized event '{kind}'"),
    }
}

/// Register loggers for every server event type and for state changes.
pub fn register(client: &RealtimeClient) {
    let log_event: EventHandler = Arc::new(|event: &ServerEvent| match event {
        ServerEvent::Error { .. } => tracing::warn!(event = event.kind(), "{}", describe(event)),
        _ => tracing::info!(event = event.kind(), "{}", describe(event)),
    });
    for kind in events::SERVER_EVENTS {
        client.on_event(kind, log_event.clone());
    }

    let log_state: Handler = Arc::new(|data: &Value| {
        let state = data["state"].as_str().unwrap_or("unknown");
        let attempt = data["attempt"].as_u64().unwrap_or(0);
        tracing::info!(state, attempt, "Connection state changed");
    });
    client.on(events::CONNECTION_STATE_CHANGED, log_state);
}
