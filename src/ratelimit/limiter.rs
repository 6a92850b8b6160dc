//! Fixed-window limiter over a point store.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, trace};

use super::result::RateLimitResult;
use crate::error::{Result, WindowError};
use crate::store::PointStore;

/// Default points per window.
const DEFAULT_LIMIT: u64 = 4;
/// Default window length.
const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Configuration for a fixed-window limit.
#[derive(Debug, Clone)]
pub struct LimitConfig {
    /// Points allowed per window
    pub limit: u64,
    /// Window length; zero means the window never expires
    pub window: Duration,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Consumes points for subject keys and reports [`RateLimitResult`]s.
///
/// Holds no counters itself; every call is a single store operation, so
/// limiters on different hosts sharing one store see the same windows.
pub struct FixedWindowLimiter {
    store: Arc<dyn PointStore>,
    config: LimitConfig,
}

impl FixedWindowLimiter {
    /// Create a limiter over `store`.
    pub fn new(store: Arc<dyn PointStore>, config: LimitConfig) -> Self {
        Self { store, config }
    }

    /// The configured limit.
    pub fn config(&self) -> &LimitConfig {
        &self.config
    }

    /// Consume `points` from the window of `key`.
    ///
    /// Always records the consumption; callers decide what to do with an
    /// over-limit result.
    #[instrument(skip(self), fields(limit = self.config.limit))]
    pub async fn consume(&self, key: &str, points: u64) -> Result<RateLimitResult> {
        if points == 0 {
            return Err(WindowError::InvalidArgument(
                "points to consume must be positive".to_string(),
            ));
        }

        let counter = self
            .store
            .upsert(key, points, self.config.window, false)
            .await?;
        let result = RateLimitResult::from_counter(points, &counter, self.config.limit);

        if result.is_over_limit(self.config.limit) {
            debug!(
                consumed = result.consumed_points,
                ms_before_next = result.ms_before_next,
                "Rate limit exceeded"
            );
        } else {
            trace!(remaining = result.remaining_points, "Points consumed");
        }
        Ok(result)
    }

    /// Overwrite the window of `key` with exactly `points` and a fresh
    /// `window`, regardless of prior state.
    #[instrument(skip(self))]
    pub async fn set(&self, key: &str, points: u64, window: Duration) -> Result<RateLimitResult> {
        let counter = self.store.upsert(key, points, window, true).await?;
        debug!(ttl_ms = counter.ttl_ms, "Window set");
        Ok(RateLimitResult::from_counter(points, &counter, self.config.limit))
    }

    /// Read the active window of `key`, if any.
    pub async fn get(&self, key: &str) -> Result<Option<RateLimitResult>> {
        let counter = self.store.get(key).await?;
        Ok(counter.map(|c| RateLimitResult::from_counter(0, &c, self.config.limit)))
    }

    /// Drop the window of `key`. Returns `true` if one existed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.store.delete(key).await
    }
}
