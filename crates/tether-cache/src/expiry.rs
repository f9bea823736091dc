//! Age checks shared by reads and the maintenance sweep.

use std::time::Duration;

/// Current time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Whether a record stamped at `stamped_ms` is at least `ttl` old at `now`.
///
/// A stamp in the future counts as age zero.
pub fn is_expired(stamped_ms: i64, ttl: Duration, now: i64) -> bool {
    let age = now.saturating_sub(stamped_ms).max(0) as u128;
    age >= ttl.as_millis()
}
