//! Utility functions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version information for the dashboard client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Parse a backend timestamp.
///
/// The API emits RFC 3339 timestamps, sometimes without an offset; those are
/// taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Human readable distance between `then` and `now`, e.g. "5 minutes ago"
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 0 {
        return "in the future".to_string();
    }

    let minutes = secs / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 1 {
        "less than a minute ago".to_string()
    } else if minutes == 1 {
        "1 minute ago".to_string()
    } else if hours < 1 {
        format!("{} minutes ago", minutes)
    } else if hours == 1 {
        "about 1 hour ago".to_string()
    } else if days < 1 {
        format!("about {} hours ago", hours)
    } else if days == 1 {
        "1 day ago".to_string()
    } else {
        format!("{} days ago", days)
    }
}

/// Relative time for a raw backend timestamp, falling back to the raw text
pub fn describe_start_time(raw: &str, now: DateTime<Utc>) -> String {
    match parse_timestamp(raw) {
        Some(ts) => relative_time(ts, now),
        None => raw.to_string(),
    }
}
