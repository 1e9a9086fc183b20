//! Refresh scheduling: staleness decisions and poll-interval jitter
//!
//! The latest `influencer_history` row is the only freshness authority; no
//! side-channel caches. Pure functions, no I/O.

use rand::Rng;

/// Decide whether an entity is stale enough to refresh
///
/// Due iff the entity has never been refreshed, or at least `interval_secs`
/// have elapsed since the last refresh.
pub fn due_for_refresh(last_refresh: Option<i64>, now: i64, interval_secs: i64) -> bool {
    match last_refresh {
        None => true,
        Some(last) => now - last >= interval_secs,
    }
}

/// Inter-cycle sleep with up to +5% random jitter
///
/// Keeps the per-platform pipelines from aligning their polling bursts.
/// Never shortens the interval, so entities are not polled early.
pub fn jittered_interval(base_secs: u64) -> u64 {
    let jitter = rand::thread_rng().gen_range(0..=base_secs / 20);
    base_secs + jitter
}
