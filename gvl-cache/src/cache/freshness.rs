use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Whether a vendor list stored at `timestamp_millis` may still be used at `now_millis`.
///
/// A missing timestamp (or `0`) is never fresh and an entry exactly `ttl` old
/// is already stale.
pub fn is_cache_fresh(timestamp_millis: Option<i64>, now_millis: i64, ttl: Duration) -> bool {
    let Some(timestamp) = timestamp_millis.filter(|t| *t != 0) else {
        return false;
    };

    let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_millis.saturating_sub(timestamp) < ttl_millis
}

/// Current wall clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
