//! Interpretation of raw store counters.

use serde::Serialize;

use crate::store::RawCounter;

/// Outcome of a consume, set or peek against a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    /// Points consumed in the current window, including this request
    pub consumed_points: u64,
    /// Whether this request opened the window
    pub is_first_in_duration: bool,
    /// Points left before the limit is reached
    pub remaining_points: u64,
    /// Milliseconds until the window resets, `-1` if it never does
    pub ms_before_next: i64,
}

impl RateLimitResult {
    /// Build a result from a store counter.
    ///
    /// Increments accumulate and the window start is fixed on first touch,
    /// so consumption equals the requested points only for the request
    /// that opened the window.
    pub fn from_counter(points_to_consume: u64, counter: &RawCounter, limit: u64) -> Self {
        Self {
            consumed_points: counter.consumed,
            is_first_in_duration: counter.consumed == points_to_consume,
            remaining_points: limit.saturating_sub(counter.consumed),
            ms_before_next: counter.ttl_ms,
        }
    }

    /// Whether consumption went past `limit`.
    pub fn is_over_limit(&self, limit: u64) -> bool {
        self.consumed_points > limit
    }
}
