//! Configuration schema types for the Drongo dashboard client.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod realtime;
mod system;

pub use realtime::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct DashboardConfig {
    pub realtime: RealtimeSettings,
    pub logging: LoggingConfig,
}
