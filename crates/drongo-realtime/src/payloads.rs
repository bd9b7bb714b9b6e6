//! Payloads pushed by the dashboard server.
//!
//! Every field has a serde default so a server that omits a field does
//! not cause the whole event to be rejected.

use serde::{Deserialize, Serialize};

/// Payload of `stats_update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub messages_processed: u64,
    pub commands_executed: u64,
    pub active_users: u64,
    pub uptime: String,
    pub status: String,
    pub memory_usage: f64,
    pub cpu_usage: f64,
    pub bot_guilds: u64,
    pub database_size: f64,
    pub recent_activity: u64,
    pub message_rate: f64,
    pub command_rate: f64,
    pub recent_messages: Vec<RecentMessage>,
    pub recent_events: Vec<RecentEvent>,
    pub database_health: DatabaseHealth,
    pub guild_breakdown: Vec<GuildStats>,
    pub last_updated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentMessage {
    pub timestamp: String,
    pub author: String,
    pub guild: String,
    pub channel: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentEvent {
    pub timestamp: String,
    pub event: String,
    /// One of `info`, `system`, `command`, `status`, `error`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Payload of `database_health`, also embedded in `stats_update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseHealth {
    pub database_size_mb: f64,
    pub table_count: u64,
    pub index_count: u64,
    pub database_files: u64,
    pub system_databases: Vec<SystemDatabase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemDatabase {
    pub name: String,
    pub file: String,
    pub size_mb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildStats {
    pub guild_id: String,
    pub guild_name: String,
    pub total_messages: u64,
    pub unique_users: u64,
    pub active_channels: u64,
    pub recent_activity: u64,
    pub database_size_mb: f64,
    pub last_message: Option<String>,
    pub is_scanning: bool,
}

/// Payload of `message_activity`: parallel arrays of buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageActivity {
    pub timestamps: Vec<String>,
    pub message_counts: Vec<u64>,
}

/// Payload of `recent_activity`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentActivity {
    pub recent_messages: Vec<RecentMessage>,
    pub recent_events: Vec<RecentEvent>,
}
