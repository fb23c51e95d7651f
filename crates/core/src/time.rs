//! Wall-clock helpers for user-facing timestamps.
//!
//! Alerts and greetings are stamped in China Standard Time (UTC+8, no DST).

use chrono::{DateTime, FixedOffset, Offset, Utc};

pub const SHANGHAI_OFFSET_SECS: i32 = 8 * 3600;

/// Fixed `+08:00` offset.
pub fn shanghai() -> FixedOffset {
    FixedOffset::east_opt(SHANGHAI_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// `YYYY-MM-DD HH:MM:SS` in `+08:00`.
pub fn format_shanghai(at: DateTime<Utc>) -> String {
    at.with_timezone(&shanghai())
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
