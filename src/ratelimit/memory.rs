// In-process rate-limit store

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{RateDecision, RateLimiter, MAX_REQUESTS, WINDOW};

/// Per-key window state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_reset_at: DateTime<Utc>,
}

/// Map of client address → window.
///
/// Check and increment happen under one lock acquisition, so concurrent
/// requests for a key never lose updates within this process. Entries are
/// never evicted.
pub struct MemoryRateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    window: TimeDelta,
    max_requests: u32,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            window: TimeDelta::from_std(WINDOW).unwrap_or_else(|_| TimeDelta::minutes(15)),
            max_requests: MAX_REQUESTS,
        }
    }

    /// Synchronous core shared by the trait impl and tests
    pub fn check_and_consume_at(&self, key: &str, now: DateTime<Utc>) -> RateDecision {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        match entries.get_mut(key) {
            Some(entry) if now <= entry.window_reset_at => {
                if entry.count < self.max_requests {
                    entry.count += 1;
                    RateDecision::Permit {
                        remaining: self.max_requests - entry.count,
                    }
                } else {
                    RateDecision::Deny {
                        retry_after: (entry.window_reset_at - now).to_std().unwrap_or_default(),
                    }
                }
            }
            // first request, or window expired
            _ => {
                entries.insert(
                    key.to_string(),
                    RateLimitEntry {
                        count: 1,
                        window_reset_at: now + self.window,
                    },
                );
                RateDecision::Permit {
                    remaining: self.max_requests - 1,
                }
            }
        }
    }

    #[cfg(test)]
    fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }
}

impl Default for MemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check_and_consume(&self, key: &str, now: DateTime<Utc>) -> RateDecision {
        self.check_and_consume_at(key, now)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
