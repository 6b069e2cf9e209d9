// Transactional email through the Resend HTTP API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{endpoint, UpstreamError};
use crate::config::ContactConfig;
use crate::validation::ContactMessage;

/// Body of `POST /emails`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub reply_to: String,
    pub text: String,
}

impl OutboundEmail {
    /// Fixed sender and recipients, tagged subject, submitter as reply-to
    pub fn from_contact(message: &ContactMessage, cfg: &ContactConfig) -> Self {
        Self {
            from: cfg.from.clone(),
            to: cfg.to.clone(),
            subject: format!("{} {}", cfg.subject_tag, message.subject),
            reply_to: message.reply_to.clone(),
            text: format!(
                "Asunto: {}\nEmail: {}\n\n{}",
                message.subject, message.reply_to, message.description
            ),
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), UpstreamError>;
}

#[derive(Deserialize)]
struct ResendErrorBody {
    message: Option<String>,
}

pub struct ResendClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl ResendClient {
    pub fn new(http: reqwest::Client, cfg: &ContactConfig) -> Self {
        Self {
            http,
            api_url: cfg.api_url.clone(),
            api_key: cfg.api_key.clone(),
        }
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, email: &OutboundEmail) -> Result<(), UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::NotConfigured("RESEND_API_KEY"))?;

        let resp = self
            .http
            .post(endpoint(&self.api_url, "/emails"))
            .bearer_auth(api_key)
            .json(email)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ResendErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
        Err(UpstreamError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::upstream::test_server::{self, FakeUpstream};

    #[test]
    fn test_email_from_contact() {
        let cfg = Config::for_tests().contact;
        let message = ContactMessage {
            subject: "Hola".to_string(),
            description: "Quiero una mentoría".to_string(),
            reply_to: "a@b.com".to_string(),
        };
        let email = OutboundEmail::from_contact(&message, &cfg);
        assert_eq!(email.from, "Contacto Coding Pit <no-reply@coding-pit.com>");
        assert_eq!(email.to, vec!["juanje.cilla@gmail.com".to_string()]);
        assert_eq!(email.subject, "[Contacto] Hola");
        assert_eq!(email.reply_to, "a@b.com");
        assert_eq!(email.text, "Asunto: Hola\nEmail: a@b.com\n\nQuiero una mentoría");
    }

    #[test]
    fn test_email_wire_format() {
        let email = OutboundEmail {
            from: "f".to_string(),
            to: vec!["t".to_string()],
            subject: "s".to_string(),
            reply_to: "r".to_string(),
            text: "x".to_string(),
        };
        let value = serde_json::to_value(&email).unwrap();
        assert_eq!(value["to"], serde_json::json!(["t"]));
        assert_eq!(value["reply_to"], "r");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let mut cfg = Config::for_tests().contact;
        cfg.api_key = None;
        let client = ResendClient::new(reqwest::Client::new(), &cfg);
        let email = OutboundEmail::from_contact(
            &ContactMessage {
                subject: "a".to_string(),
                description: "b".to_string(),
                reply_to: "c@d.es".to_string(),
            },
            &cfg,
        );
        let err = client.send(&email).await.unwrap_err();
        assert!(matches!(err, UpstreamError::NotConfigured("RESEND_API_KEY")));
    }

    fn contact_email(cfg: &ContactConfig) -> OutboundEmail {
        OutboundEmail::from_contact(
            &ContactMessage {
                subject: "Hola".to_string(),
                description: "Quiero una mentoría".to_string(),
                reply_to: "a@b.co".to_string(),
            },
            cfg,
        )
    }

    async fn send_against(
        status: u16,
        body: &'static str,
    ) -> (Result<(), UpstreamError>, OutboundEmail, FakeUpstream) {
        let upstream = FakeUpstream::start(status, body).await;
        let mut cfg = Config::for_tests().contact;
        cfg.api_url = upstream.base_url.clone();
        cfg.api_key = Some("re_x".to_string());
        let email = contact_email(&cfg);
        let result = ResendClient::new(test_server::client(), &cfg).send(&email).await;
        (result, email, upstream)
    }

    #[tokio::test]
    async fn test_posts_email_with_bearer_key() {
        let (result, email, upstream) = send_against(200, r#"{"id":"49a3999c"}"#).await;
        result.unwrap();

        let req = upstream.only_request();
        assert_eq!(req.method, reqwest::Method::POST);
        assert_eq!(req.path, "/emails");
        assert_eq!(req.headers["authorization"], "Bearer re_x");
        assert_eq!(req.headers["content-type"], "application/json");
        let sent: serde_json::Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(sent, serde_json::to_value(&email).unwrap());
        assert_eq!(sent["subject"], "[Contacto] Hola");
    }

    #[tokio::test]
    async fn test_error_body_message_is_kept() {
        let (result, _, _) = send_against(
            422,
            r#"{"statusCode":422,"name":"validation_error","message":"Invalid `to` field"}"#,
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(
            &err,
            UpstreamError::Rejected { status: 422, message } if message == "Invalid `to` field"
        ));
        assert_eq!(err.upstream_message(), Some("Invalid `to` field"));
    }

    #[tokio::test]
    async fn test_non_json_error_falls_back_to_reason() {
        let (result, _, _) = send_against(503, "upstream connect error").await;
        assert!(matches!(
            result.unwrap_err(),
            UpstreamError::Rejected { status: 503, message } if message == "Service Unavailable"
        ));

        let (result, _, _) = send_against(401, r#"{"name":"missing_api_key"}"#).await;
        assert!(matches!(
            result.unwrap_err(),
            UpstreamError::Rejected { status: 401, message } if message == "Unauthorized"
        ));
    }
}
