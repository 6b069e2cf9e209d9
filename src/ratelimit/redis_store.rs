// Redis-backed rate-limit store, shared by every instance pointing at the same server

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::{RateDecision, RateLimiter, MAX_REQUESTS, WINDOW};
use crate::logger;

/// INCR and first-hit PEXPIRE must run as one step, otherwise a crash in
/// between leaves a counter with no TTL.
const FIXED_WINDOW_SCRIPT: &str = r"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return {current, redis.call('PTTL', KEYS[1])}
";

const OP_TIMEOUT: Duration = Duration::from_millis(500);

pub struct RedisRateLimiter {
    client: redis::Client,
    prefix: String,
    conn: Mutex<Option<MultiplexedConnection>>,
    script: redis::Script,
}

impl RedisRateLimiter {
    /// Parses the URL only; the connection is opened on first use
    pub fn new(url: &str, prefix: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            prefix: prefix.to_string(),
            conn: Mutex::new(None),
            script: redis::Script::new(FIXED_WINDOW_SCRIPT),
        })
    }

    fn counter_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    async fn connection(&self) -> redis::RedisResult<MultiplexedConnection> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_multiplexed_async_connection().await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn forget_connection(&self) {
        *self.conn.lock().await = None;
    }

    async fn incr_window(&self, key: &str) -> redis::RedisResult<(u64, i64)> {
        let mut conn = self.connection().await?;
        let window_ms = u64::try_from(WINDOW.as_millis()).unwrap_or(u64::MAX);
        let mut invocation = self.script.key(self.counter_key(key));
        invocation.arg(window_ms);
        invocation.invoke_async(&mut conn).await
    }
}

/// Map the counter state after INCR to a decision
fn decide(count: u64, pttl_ms: i64) -> RateDecision {
    let max = u64::from(MAX_REQUESTS);
    if count <= max {
        RateDecision::Permit {
            remaining: u32::try_from(max - count).unwrap_or(0),
        }
    } else {
        let retry_after = u64::try_from(pttl_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map_or(WINDOW, Duration::from_millis);
        RateDecision::Deny { retry_after }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check_and_consume(&self, key: &str, _now: DateTime<Utc>) -> RateDecision {
        let failure = match timeout(OP_TIMEOUT, self.incr_window(key)).await {
            Ok(Ok((count, pttl_ms))) => return decide(count, pttl_ms),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {}ms", OP_TIMEOUT.as_millis()),
        };
        // fail open: an unreachable store must not block subscriptions
        logger::log_warning(&format!(
            "Rate-limit store unavailable, permitting request: {failure}"
        ));
        self.forget_connection().await;
        RateDecision::Permit {
            remaining: MAX_REQUESTS - 1,
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_key() {
        let limiter = RedisRateLimiter::new("redis://127.0.0.1/", "codingpit:newsletter:").unwrap();
        assert_eq!(limiter.counter_key("203.0.113.7"), "codingpit:newsletter:203.0.113.7");
    }

    #[test]
    fn test_decide() {
        assert_eq!(decide(1, 900_000), RateDecision::Permit { remaining: 4 });
        assert_eq!(decide(5, 1_000), RateDecision::Permit { remaining: 0 });
        assert_eq!(
            decide(6, 120_000),
            RateDecision::Deny {
                retry_after: Duration::from_secs(120)
            }
        );
        // missing TTL falls back to a full window
        assert_eq!(decide(9, -1), RateDecision::Deny { retry_after: WINDOW });
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(RedisRateLimiter::new("not a url", "p:").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_open() {
        // port 1 is never a redis server
        let limiter = RedisRateLimiter::new("redis://127.0.0.1:1/", "p:").unwrap();
        let decision = limiter.check_and_consume("k", Utc::now()).await;
        assert!(matches!(decision, RateDecision::Permit { .. }));
    }
}
