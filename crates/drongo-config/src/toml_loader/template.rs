//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Drongo dashboard client configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[realtime]
origin = "http://localhost:5001"
# max_reconnect_attempts = 5     # 1-100
# reconnect_delay_ms = 2000      # 1-60000, multiplied by the attempt number
# heartbeat_interval_secs = 30   # 0 disables the ping heartbeat
# connect_timeout_secs = 15      # 1-300

[logging]
# level = "info"                 # trace, debug, info, warn, error
"##
    .to_string()
}
