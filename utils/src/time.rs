//! Time formatting helpers.

use chrono::DateTime;
use likegate_types::Timestamp;
use std::time::Duration;

/// Format a duration as whole hours and minutes, rounding down: `"23h 0m"`.
pub fn format_hours_minutes(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_utc(ts: Timestamp) -> String {
    i64::try_from(ts.as_secs())
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
