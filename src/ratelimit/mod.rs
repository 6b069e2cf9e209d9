//! Fixed-window rate limiting keyed by client address
//!
//! Two stores implement [`RateLimiter`]: a process-local map for single
//! instances and a Redis counter shared by every instance. The store is
//! chosen from configuration and owned by `AppState`.

mod memory;
mod redis_store;

pub use memory::MemoryRateLimiter;
pub use redis_store::RedisRateLimiter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RateLimitBackend, RateLimitConfig};

/// Length of one window
pub const WINDOW: Duration = Duration::from_secs(15 * 60);
/// Requests permitted per key inside one window
pub const MAX_REQUESTS: u32 = 5;
/// Advisory `Retry-After` value sent with every denial
pub const RETRY_AFTER_SECS: u64 = WINDOW.as_secs();

/// Result of one `check_and_consume` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Permit { remaining: u32 },
    Deny { retry_after: Duration },
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request for `key` at `now` and decide whether it may proceed.
    /// Denied requests do not extend or reset the window.
    async fn check_and_consume(&self, key: &str, now: DateTime<Utc>) -> RateDecision;

    /// Short name for startup logs
    fn backend_name(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitSetupError {
    #[error("rate_limit.backend = \"redis\" requires rate_limit.redis_url")]
    MissingRedisUrl,
    #[error("invalid redis url: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Build the configured store
pub fn from_config(cfg: &RateLimitConfig) -> Result<Arc<dyn RateLimiter>, RateLimitSetupError> {
    match cfg.backend {
        RateLimitBackend::Memory => Ok(Arc::new(MemoryRateLimiter::new())),
        RateLimitBackend::Redis => {
            let url = cfg
                .redis_url
                .as_deref()
                .ok_or(RateLimitSetupError::MissingRedisUrl)?;
            Ok(Arc::new(RedisRateLimiter::new(url, &cfg.key_prefix)?))
        }
    }
}
