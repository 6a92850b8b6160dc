//! Point stores: where fixed-window counters live.
//!
//! Every backend implements [`PointStore`] with the same three operations.
//! The backend is chosen at construction time.

mod memory;
mod remote;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

pub use memory::MemoryStore;
pub use remote::{RedisStore, RedisStoreBuilder, StoreClient, StoreOptions};

/// Raw state of a counter record as reported by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCounter {
    /// Points consumed in the current window
    pub consumed: u64,
    /// Milliseconds until the window resets, `-1` when the record never expires
    pub ttl_ms: i64,
}

impl RawCounter {
    /// Create a raw counter.
    pub fn new(consumed: u64, ttl_ms: i64) -> Self {
        Self { consumed, ttl_ms }
    }

    /// Whether the record has no expiry.
    pub fn is_persistent(&self) -> bool {
        self.ttl_ms == -1
    }
}

/// Storage backend for fixed-window point consumption.
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Atomically add `points` to the window for `key`, opening a window of
    /// length `window` if none is active.
    ///
    /// With `force_expire`, the record is overwritten with exactly `points`
    /// and a fresh window regardless of prior state. A zero `window` means
    /// no expiry.
    ///
    /// Window precision depends on the backend: [`RedisStore`] floors to
    /// whole seconds, so a sub-second window becomes a record without
    /// expiry, while [`MemoryStore`] keeps milliseconds. A window too large
    /// for the backend is an error, never a panic.
    async fn upsert(
        &self,
        key: &str,
        points: u64,
        window: Duration,
        force_expire: bool,
    ) -> Result<RawCounter>;

    /// Read the active window for `key` without mutating it.
    ///
    /// Returns `None` when the key is absent or has no expiry.
    async fn get(&self, key: &str) -> Result<Option<RawCounter>>;

    /// Remove the record. Returns `true` iff a record existed.
    async fn delete(&self, key: &str) -> Result<bool>;
}
