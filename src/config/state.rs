// Application state module
// Owns configuration, the rate-limit store and the upstream relays

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use super::types::Config;
use crate::ratelimit::{self, RateLimitSetupError, RateLimiter};
use crate::upstream::{
    self, CheckoutGateway, EmailSender, ListmonkClient, MailingList, ResendClient, StripeClient,
};

/// External collaborators, injectable so tests can stub them
#[derive(Clone)]
pub struct Upstreams {
    pub mailer: Arc<dyn EmailSender>,
    pub mailing_list: Arc<dyn MailingList>,
    pub payments: Arc<dyn CheckoutGateway>,
}

impl Upstreams {
    /// Production clients sharing one connection pool
    pub fn from_config(config: &Config) -> Self {
        let http = upstream::http_client(Duration::from_secs(config.upstream.timeout_secs));
        Self {
            mailer: Arc::new(ResendClient::new(http.clone(), &config.contact)),
            mailing_list: Arc::new(ListmonkClient::new(http.clone(), &config.newsletter)),
            payments: Arc::new(StripeClient::new(http, &config.checkout)),
        }
    }
}

/// Application state
pub struct AppState {
    pub config: Config,
    pub upstreams: Upstreams,
    /// Subscription rate-limit store; the only shared mutable state
    pub rate_limiter: Arc<dyn RateLimiter>,

    // Cached config values for fast access without locks
    pub cached_access_log: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: Config, upstreams: Upstreams, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        let cached_access_log = Arc::new(AtomicBool::new(config.logging.access_log));
        Self {
            config,
            upstreams,
            rate_limiter,
            cached_access_log,
        }
    }

    /// Build production state from configuration
    pub fn from_config(config: Config) -> Result<Self, RateLimitSetupError> {
        let rate_limiter = ratelimit::from_config(&config.rate_limit)?;
        let upstreams = Upstreams::from_config(&config);
        Ok(Self::new(config, upstreams, rate_limiter))
    }
}
