//! Formatting helpers for command output.

use chrono::{DateTime, Utc};

/// Format how long ago `dt` was, relative to `now`.
///
/// # Examples
/// ```
/// use cfsync::utils::format_duration_ago;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// assert_eq!(format_duration_ago(now - Duration::minutes(5), now), "5m ago");
/// assert_eq!(format_duration_ago(now - Duration::hours(3), now), "3h ago");
/// ```
pub fn format_duration_ago(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(dt).num_seconds();
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86400)
    }
}

/// Shorten a fingerprint for display (first 12 hex digits).
pub fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
