//! Time constants for retention and sweep scheduling

/// Seconds per minute
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Seconds per hour
pub const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;

/// Seconds per day
pub const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Retention period in seconds for a number of days
#[must_use]
pub const fn retention_secs(days: u32) -> i64 {
    days as i64 * SECONDS_PER_DAY as i64
}
