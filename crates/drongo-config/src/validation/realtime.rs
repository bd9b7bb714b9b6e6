//! Validation for the `[realtime]` section.

use crate::schema::DashboardConfig;

use super::helpers::validate_range;

pub(super) fn validate_realtime(errors: &mut Vec<String>, config: &DashboardConfig) {
    let rt = &config.realtime;

    let origin = rt.origin.trim();
    if !(origin.starts_with("http://") || origin.starts_with("https://")) {
        errors.push(format!(
            "realtime.origin = {:?} must start with http:// or https://",
            rt.origin
        ));
    }

    validate_range(
        errors,
        "realtime.max_reconnect_attempts",
        u64::from(rt.max_reconnect_attempts),
        1,
        100,
    );
    validate_range(errors, "realtime.reconnect_delay_ms", rt.reconnect_delay_ms, 1, 60_000);
    validate_range(
        errors,
        "realtime.heartbeat_interval_secs",
        rt.heartbeat_interval_secs,
        0,
        3600,
    );
    validate_range(errors, "realtime.connect_timeout_secs", rt.connect_timeout_secs, 1, 300);
}
