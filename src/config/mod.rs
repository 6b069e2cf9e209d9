// Configuration module entry point
// Loads layered configuration and owns the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
#[cfg(test)]
pub use state::Upstreams;
pub use types::{
    CheckoutConfig, Config, ContactConfig, NewsletterConfig, RateLimitBackend, RateLimitConfig,
};

/// Environment variable holding the Resend API key
const RESEND_API_KEY_VAR: &str = "RESEND_API_KEY";
/// Environment variable holding the Stripe secret key
const STRIPE_SECRET_KEY_VAR: &str = "STRIPE_SECRET_KEY";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("RELAY").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 4321)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.shutdown_grace", 10)?
            .set_default("http.server_name", "codingpit-relay/0.1")?
            .set_default("http.enable_cors", false)?
            .set_default("http.cors_origin", "*")?
            .set_default("http.max_body_size", 65_536)? // 64KB
            .set_default("http.trust_forwarded_for", false)?
            .set_default("rate_limit.backend", "memory")?
            .set_default("rate_limit.key_prefix", "codingpit:newsletter:")?
            .set_default("upstream.timeout_secs", 10)?
            .set_default("contact.api_url", "https://api.resend.com")?
            .set_default("contact.from", "Contacto Coding Pit <no-reply@coding-pit.com>")?
            .set_default("contact.to", vec!["juanje.cilla@gmail.com"])?
            .set_default("contact.subject_tag", "[Contacto]")?
            .set_default("newsletter.enabled", true)?
            .set_default("newsletter.base_url", "https://codingpit-listmonk.zeabur.app")?
            .set_default("newsletter.list_id", "newsletter")?
            .set_default("newsletter.user_agent", "CodingPit-Newsletter-Subscription/1.0")?
            .set_default("checkout.api_url", "https://api.stripe.com")?
            .set_default("checkout.api_version", "2025-06-30.basil")?
            .set_default("checkout.fallback_origin", "http://localhost:4321")?
            .set_default("checkout.success_path", "/gracias")?
            .set_default("checkout.cancel_path", "/formacion/mentorias")?
            .set_default("checkout.prices.mensual", "price_xxx_mensual")?
            .set_default("checkout.prices.trimestral", "price_xxx_trimestral")?
            .set_default("checkout.prices.anual", "price_xxx_anual")?
            .set_override_option("contact.api_key", std::env::var(RESEND_API_KEY_VAR).ok())?
            .set_override_option(
                "checkout.secret_key",
                std::env::var(STRIPE_SECRET_KEY_VAR).ok(),
            )?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Defaults only, as seen by a process started without a config file
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::load_from("__codingpit_relay_test_config__").expect("defaults deserialize")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::CheckoutPlan;
    use super::types::PriceTable;

    #[test]
    fn test_defaults() {
        let cfg = Config::for_tests();
        assert_eq!(cfg.server.port, 4321);
        assert_eq!(cfg.rate_limit.backend, RateLimitBackend::Memory);
        assert_eq!(cfg.contact.to, vec!["juanje.cilla@gmail.com".to_string()]);
        assert_eq!(cfg.checkout.prices, PriceTable::default());
        assert!(cfg.newsletter.enabled);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::for_tests();
        let addr = cfg.get_socket_addr().unwrap();
        assert_eq!(addr.port(), 4321);
    }

    #[test]
    fn test_price_lookup() {
        let prices = PriceTable::default();
        assert_eq!(prices.price_for(CheckoutPlan::Monthly), "price_xxx_mensual");
        assert_eq!(prices.price_for(CheckoutPlan::Quarterly), "price_xxx_trimestral");
        assert_eq!(prices.price_for(CheckoutPlan::Annual), "price_xxx_anual");
    }
}
