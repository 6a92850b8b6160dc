//! Fixed-window rate limiting on top of a point store.

mod limiter;
mod result;

pub use limiter::{FixedWindowLimiter, LimitConfig};
pub use result::RateLimitResult;
