//! In-process point store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::trace;

use super::{PointStore, RawCounter};
use crate::error::{Result, WindowError};

/// A counter slot and its deadline.
#[derive(Debug, Clone, Copy)]
struct Slot {
    consumed: u64,
    /// `None` for a record that never expires
    expires_at: Option<Instant>,
}

/// Deadline of a window opened at `now`; `None` for a zero window.
fn deadline(now: Instant, window: Duration) -> Result<Option<Instant>> {
    if window.is_zero() {
        return Ok(None);
    }
    now.checked_add(window).map(Some).ok_or_else(|| {
        WindowError::InvalidArgument(format!("window of {:?} is out of range", window))
    })
}

impl Slot {
    fn open(consumed: u64, expires_at: Option<Instant>) -> Self {
        Self {
            consumed,
            expires_at,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }

    fn counter(&self, now: Instant) -> RawCounter {
        let ttl_ms = match self.expires_at {
            Some(deadline) => {
                i64::try_from(deadline.saturating_duration_since(now).as_millis()).unwrap_or(i64::MAX)
            }
            None => -1,
        };
        RawCounter::new(self.consumed, ttl_ms)
    }
}

/// Fixed-window store held in a concurrent map.
///
/// Each key's read-modify-write happens under the map shard's lock, which
/// gives the same per-key atomicity the Redis procedures have. Windows keep
/// millisecond precision. Expired slots count as absent and are replaced on
/// the next write or dropped by [`MemoryStore::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: DashMap<String, Slot>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records with a live window or no expiry.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots.iter().filter(|s| !s.is_expired(now)).count()
    }

    /// Whether no live records exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired records, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_expired(now));
        before - self.slots.len()
    }
}

#[async_trait]
impl PointStore for MemoryStore {
    async fn upsert(
        &self,
        key: &str,
        points: u64,
        window: Duration,
        force_expire: bool,
    ) -> Result<RawCounter> {
        let now = Instant::now();
        let expires_at = deadline(now, window)?;
        let mut slot = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| Slot::open(0, expires_at));

        if force_expire {
            *slot = Slot::open(points, expires_at);
        } else {
            if slot.is_expired(now) {
                *slot = Slot::open(0, expires_at);
            }
            slot.consumed = slot.consumed.saturating_add(points);
        }

        let counter = slot.counter(now);
        trace!(key = %key, consumed = counter.consumed, ttl_ms = counter.ttl_ms, "Upserted slot");
        Ok(counter)
    }

    async fn get(&self, key: &str) -> Result<Option<RawCounter>> {
        let now = Instant::now();
        let Some(slot) = self.slots.get(key) else {
            // Absent
            return Ok(None);
        };

        if slot.expires_at.is_none() {
            // Persistent records are not an active window.
            return Ok(None);
        }
        if slot.is_expired(now) {
            return Ok(None);
        }
        Ok(Some(slot.counter(now)))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .slots
            .remove(key)
            .map(|(_, slot)| !slot.is_expired(now))
            .unwrap_or(false))
    }
}
