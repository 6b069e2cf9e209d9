// Newsletter subscription through a Listmonk public subscription form

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;

use super::endpoint;
use crate::config::NewsletterConfig;
use crate::logger;
use crate::validation::SubscriptionRequest;

const SUBSCRIPTION_FORM_PATH: &str = "/subscription/form";

pub const MSG_ALREADY_SUBSCRIBED: &str = "Ya estás suscrito a nuestra newsletter";
pub const MSG_INVALID_DATA: &str = "Datos de suscripción inválidos";
pub const MSG_PROCESSING_FAILED: &str = "Error al procesar la suscripción";
pub const MSG_CONNECTION_FAILED: &str = "Error de conexión. Inténtalo de nuevo más tarde.";

/// Normalized result of one subscription attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    Subscribed,
    /// The list refused this subscriber (duplicate, bad data)
    Rejected(&'static str),
    /// The list could not be reached or failed unexpectedly
    Unavailable(&'static str),
}

impl SubscriptionOutcome {
    pub const fn error(&self) -> Option<&'static str> {
        match self {
            Self::Subscribed => None,
            Self::Rejected(msg) | Self::Unavailable(msg) => Some(*msg),
        }
    }
}

/// Map the list's HTTP status to an outcome
pub fn outcome_for_status(status: StatusCode) -> SubscriptionOutcome {
    if status.is_success() {
        return SubscriptionOutcome::Subscribed;
    }
    match status {
        StatusCode::CONFLICT => SubscriptionOutcome::Rejected(MSG_ALREADY_SUBSCRIBED),
        StatusCode::BAD_REQUEST => SubscriptionOutcome::Rejected(MSG_INVALID_DATA),
        _ => SubscriptionOutcome::Unavailable(MSG_PROCESSING_FAILED),
    }
}

/// Never fails: every error becomes an outcome
#[async_trait]
pub trait MailingList: Send + Sync {
    async fn subscribe(&self, request: &SubscriptionRequest) -> SubscriptionOutcome;
}

pub struct ListmonkClient {
    http: reqwest::Client,
    form_url: String,
    list_id: String,
    user_agent: String,
}

impl ListmonkClient {
    pub fn new(http: reqwest::Client, cfg: &NewsletterConfig) -> Self {
        Self {
            http,
            form_url: endpoint(&cfg.base_url, SUBSCRIPTION_FORM_PATH),
            list_id: cfg.list_id.clone(),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

#[async_trait]
impl MailingList for ListmonkClient {
    async fn subscribe(&self, request: &SubscriptionRequest) -> SubscriptionOutcome {
        let form = [
            ("email", request.email.as_str()),
            ("name", request.name.as_str()),
            ("l", self.list_id.as_str()),
        ];
        let result = self
            .http
            .post(&self.form_url)
            .header(USER_AGENT, &self.user_agent)
            .form(&form)
            .send()
            .await;

        match result {
            Ok(resp) => {
                let status = resp.status();
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    logger::log_error(&format!("Listmonk API error: {} {body}", status.as_u16()));
                }
                outcome_for_status(status)
            }
            Err(e) => {
                logger::log_error(&format!("Network error submitting to Listmonk: {e}"));
                SubscriptionOutcome::Unavailable(MSG_CONNECTION_FAILED)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::upstream::test_server::{self, FakeUpstream};

    #[test]
    fn test_status_mapping() {
        assert_eq!(outcome_for_status(StatusCode::OK), SubscriptionOutcome::Subscribed);
        assert_eq!(outcome_for_status(StatusCode::CREATED), SubscriptionOutcome::Subscribed);

        let conflict = outcome_for_status(StatusCode::CONFLICT);
        assert!(conflict.error().unwrap().contains("suscrito"));

        let bad = outcome_for_status(StatusCode::BAD_REQUEST);
        assert!(bad.error().unwrap().contains("inválid"));
        assert!(matches!(bad, SubscriptionOutcome::Rejected(_)));

        assert_eq!(
            outcome_for_status(StatusCode::BAD_GATEWAY),
            SubscriptionOutcome::Unavailable(MSG_PROCESSING_FAILED)
        );
        assert_eq!(outcome_for_status(StatusCode::OK).error(), None);
    }

    #[test]
    fn test_form_url() {
        let mut cfg = Config::for_tests().newsletter;
        cfg.base_url = "https://lists.example.com/".to_string();
        let client = ListmonkClient::new(reqwest::Client::new(), &cfg);
        assert_eq!(client.form_url, "https://lists.example.com/subscription/form");
        assert_eq!(client.list_id, "newsletter");
    }

    fn ana() -> SubscriptionRequest {
        SubscriptionRequest {
            name: "Ana".to_string(),
            email: "a@b.co".to_string(),
        }
    }

    async fn subscribe_against(status: u16, body: &'static str) -> (SubscriptionOutcome, FakeUpstream) {
        let upstream = FakeUpstream::start(status, body).await;
        let mut cfg = Config::for_tests().newsletter;
        cfg.base_url = upstream.base_url.clone();
        let outcome = ListmonkClient::new(test_server::client(), &cfg)
            .subscribe(&ana())
            .await;
        (outcome, upstream)
    }

    #[tokio::test]
    async fn test_posts_public_subscription_form() {
        let (outcome, upstream) = subscribe_against(200, r#"{"data":true}"#).await;
        assert_eq!(outcome, SubscriptionOutcome::Subscribed);

        let req = upstream.only_request();
        assert_eq!(req.method, reqwest::Method::POST);
        assert_eq!(req.path, "/subscription/form");
        assert_eq!(req.headers["user-agent"], "CodingPit-Newsletter-Subscription/1.0");
        assert_eq!(req.headers["content-type"], "application/x-www-form-urlencoded");
        assert_eq!(req.body, "email=a%40b.co&name=Ana&l=newsletter");
    }

    #[tokio::test]
    async fn test_response_status_becomes_outcome() {
        let cases = [
            (201, r#"{"data":true}"#, SubscriptionOutcome::Subscribed),
            (
                409,
                r#"{"message":"E-mail already exists."}"#,
                SubscriptionOutcome::Rejected(MSG_ALREADY_SUBSCRIBED),
            ),
            (
                400,
                r#"{"message":"invalid email"}"#,
                SubscriptionOutcome::Rejected(MSG_INVALID_DATA),
            ),
            (500, r#"{"message":"db down"}"#, SubscriptionOutcome::Unavailable(MSG_PROCESSING_FAILED)),
            (502, "<html>Bad Gateway</html>", SubscriptionOutcome::Unavailable(MSG_PROCESSING_FAILED)),
        ];
        for (status, body, expected) in cases {
            let (outcome, upstream) = subscribe_against(status, body).await;
            assert_eq!(outcome, expected, "status {status}");
            upstream.only_request();
        }
    }

    #[tokio::test]
    async fn test_unreachable_list_is_connection_failure() {
        let mut cfg = Config::for_tests().newsletter;
        cfg.base_url = "http://127.0.0.1:1".to_string();
        let client = ListmonkClient::new(reqwest::Client::new(), &cfg);
        let outcome = client
            .subscribe(&SubscriptionRequest {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
            })
            .await;
        assert_eq!(outcome, SubscriptionOutcome::Unavailable(MSG_CONNECTION_FAILED));
    }
}
