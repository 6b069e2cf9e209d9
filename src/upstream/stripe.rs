// Stripe Checkout Session creation (single payment, card only)

use async_trait::async_trait;
use serde::Deserialize;

use super::{endpoint, UpstreamError};
use crate::config::CheckoutConfig;
use crate::validation::CheckoutPlan;

const SESSIONS_PATH: &str = "/v1/checkout/sessions";

/// Everything needed to open one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutSessionRequest {
    /// Redirect URLs hang off the requesting site's origin
    pub fn for_plan(plan: CheckoutPlan, origin: &str, cfg: &CheckoutConfig) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            price_id: cfg.prices.price_for(plan).to_string(),
            success_url: format!("{origin}{}?plan={plan}", cfg.success_path),
            cancel_url: format!("{origin}{}?cancel=true", cfg.cancel_path),
        }
    }

    /// Form fields in Stripe's bracket notation
    fn form(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("payment_method_types[0]", "card"),
            ("line_items[0][price]", self.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("mode", "payment"),
            ("success_url", self.success_url.as_str()),
            ("cancel_url", self.cancel_url.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Null once the session is complete or expired
    pub url: Option<String>,
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, UpstreamError>;
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

pub struct StripeClient {
    http: reqwest::Client,
    sessions_url: String,
    api_version: String,
    secret_key: Option<String>,
}

impl StripeClient {
    pub fn new(http: reqwest::Client, cfg: &CheckoutConfig) -> Self {
        Self {
            http,
            sessions_url: endpoint(&cfg.api_url, SESSIONS_PATH),
            api_version: cfg.api_version.clone(),
            secret_key: cfg.secret_key.clone(),
        }
    }
}

#[async_trait]
impl CheckoutGateway for StripeClient {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, UpstreamError> {
        let secret_key = self
            .secret_key
            .as_deref()
            .ok_or(UpstreamError::NotConfigured("STRIPE_SECRET_KEY"))?;

        let resp = self
            .http
            .post(&self.sessions_url)
            .bearer_auth(secret_key)
            .header("Stripe-Version", &self.api_version)
            .form(&request.form())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}
