//! Newsletter subscription relay
//!
//! Order matters: switch, rate limit, parse, validate, then the single
//! upstream call. Nothing reaches the mailing list unless every earlier
//! step passed.

use chrono::Utc;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::RelayRequest;
use crate::config::AppState;
use crate::http::{json_response, with_retry_after};
use crate::logger;
use crate::ratelimit::{RateDecision, RETRY_AFTER_SECS};
use crate::upstream::SubscriptionOutcome;
use crate::validation::{prepare_subscription, SubscriptionInput};

pub const ROUTE: &str = "newsletter";
pub const MSG_RATE_LIMITED: &str = "Demasiadas solicitudes. Inténtalo de nuevo en 15 minutos.";
pub const MSG_BAD_FORMAT: &str = "Formato de datos inválido";
pub const MSG_INTERNAL: &str = "Error interno del servidor. Inténtalo de nuevo más tarde.";
pub const MSG_DISABLED: &str = "Newsletter functionality is temporarily unavailable";

#[derive(Debug, Serialize)]
pub struct SubscriptionReply<'a> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

pub fn reply(status: StatusCode, error: Option<&str>) -> Response<Full<Bytes>> {
    json_response(
        status,
        &SubscriptionReply {
            success: error.is_none(),
            error,
        },
    )
}

pub async fn handle_newsletter(req: &RelayRequest, state: &AppState) -> Response<Full<Bytes>> {
    let client = req.client_addr.as_str();

    if !state.config.newsletter.enabled {
        logger::log_relay(ROUTE, client, 503, "relay disabled");
        return reply(StatusCode::SERVICE_UNAVAILABLE, Some(MSG_DISABLED));
    }

    match state.rate_limiter.check_and_consume(client, Utc::now()).await {
        RateDecision::Permit { remaining } => {
            logger::log_debug(&format!("[Relay] {ROUTE} client={client} remaining={remaining}"));
        }
        RateDecision::Deny { retry_after } => {
            logger::log_relay(
                ROUTE,
                client,
                429,
                &format!("rate limited, window resets in {}s", retry_after.as_secs()),
            );
            return with_retry_after(
                reply(StatusCode::TOO_MANY_REQUESTS, Some(MSG_RATE_LIMITED)),
                RETRY_AFTER_SECS,
            );
        }
    }

    let Ok(body) = serde_json::from_slice::<Value>(&req.body) else {
        logger::log_relay(ROUTE, client, 400, "malformed JSON body");
        return reply(StatusCode::BAD_REQUEST, Some(MSG_BAD_FORMAT));
    };

    let subscription = match prepare_subscription(&SubscriptionInput::from_json(&body)) {
        Ok(s) => s,
        Err(result) => {
            let errors = result.joined();
            logger::log_relay(ROUTE, client, 400, &errors);
            return reply(StatusCode::BAD_REQUEST, Some(errors.as_str()));
        }
    };

    let outcome = state.upstreams.mailing_list.subscribe(&subscription).await;
    let status = match outcome {
        SubscriptionOutcome::Subscribed => StatusCode::OK,
        SubscriptionOutcome::Rejected(_) => StatusCode::BAD_REQUEST,
        SubscriptionOutcome::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    logger::log_relay(ROUTE, client, status.as_u16(), outcome.error().unwrap_or("subscribed"));
    reply(status, outcome.error())
}
