// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

use crate::validation::CheckoutPlan;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub rate_limit: RateLimitConfig,
    pub upstream: UpstreamConfig,
    pub contact: ContactConfig,
    pub newsletter: NewsletterConfig,
    pub checkout: CheckoutConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level written: error, warn, info or debug
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
    /// Seconds to wait for in-flight connections on shutdown
    pub shutdown_grace: u64,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    /// Value sent in `Access-Control-Allow-Origin` when CORS is enabled
    pub cors_origin: String,
    pub max_body_size: u64,
    /// Use the first `X-Forwarded-For` entry as the client address
    pub trust_forwarded_for: bool,
}

/// Rate-limit store selection
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitBackend {
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub backend: RateLimitBackend,
    #[serde(default)]
    pub redis_url: Option<String>,
    pub key_prefix: String,
}

/// Settings shared by every outbound HTTP client
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub timeout_secs: u64,
}

/// Contact relay (Resend)
#[derive(Debug, Deserialize, Clone)]
pub struct ContactConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_url: String,
    pub from: String,
    pub to: Vec<String>,
    pub subject_tag: String,
}

/// Newsletter relay (Listmonk)
#[derive(Debug, Deserialize, Clone)]
pub struct NewsletterConfig {
    /// When false the route answers 503 without running the relay
    pub enabled: bool,
    pub base_url: String,
    pub list_id: String,
    pub user_agent: String,
}

/// Checkout relay (Stripe)
#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub secret_key: Option<String>,
    pub api_url: String,
    pub api_version: String,
    /// Used to build redirect URLs when the request carries no `Origin`
    pub fallback_origin: String,
    pub success_path: String,
    pub cancel_path: String,
    pub prices: PriceTable,
}

/// Plan → Stripe price identifier
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PriceTable {
    pub mensual: String,
    pub trimestral: String,
    pub anual: String,
}

impl PriceTable {
    pub fn price_for(&self, plan: CheckoutPlan) -> &str {
        match plan {
            CheckoutPlan::Monthly => &self.mensual,
            CheckoutPlan::Quarterly => &self.trimestral,
            CheckoutPlan::Annual => &self.anual,
        }
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            mensual: "price_xxx_mensual".to_string(),
            trimestral: "price_xxx_trimestral".to_string(),
            anual: "price_xxx_anual".to_string(),
        }
    }
}
