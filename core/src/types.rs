//! Shared primitive types used across the progression engine.

use chrono::{DateTime, TimeZone, Utc};

/// Account identifier (owned by the excluded auth subsystem).
pub type UserId = String;

/// Artist card identifier.
pub type CardId = String;

/// Release identifier.
pub type ReleaseId = String;

/// Wall-clock instant used for cooldowns, renewals and audit stamps.
pub type Timestamp = DateTime<Utc>;

/// Seconds since the Unix epoch, as persisted in SQLite.
pub fn to_epoch(ts: Timestamp) -> i64 {
    ts.timestamp()
}

/// Inverse of `to_epoch`. Out-of-range values collapse to the epoch.
pub fn from_epoch(secs: i64) -> Timestamp {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
