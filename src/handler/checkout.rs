//! Checkout session relay: plan name in, payment redirect URL out

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde_json::Value;

use super::RelayRequest;
use crate::config::AppState;
use crate::http::{error_response, json_response};
use crate::logger;
use crate::upstream::CheckoutSessionRequest;
use crate::validation::validate_checkout_plan;

pub const ROUTE: &str = "checkout";
pub const MSG_INVALID_PLAN: &str = "Invalid plan";
pub const MSG_STRIPE_ERROR: &str = "Stripe error";

pub async fn handle_checkout(req: &RelayRequest, state: &AppState) -> Response<Full<Bytes>> {
    let client = req.client_addr.as_str();

    let Ok(body) = serde_json::from_slice::<Value>(&req.body) else {
        logger::log_relay(ROUTE, client, 500, "malformed JSON body");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_STRIPE_ERROR);
    };

    let Some(plan) = validate_checkout_plan(body.get("plan")) else {
        logger::log_relay(ROUTE, client, 400, "invalid plan");
        return error_response(StatusCode::BAD_REQUEST, MSG_INVALID_PLAN);
    };

    let cfg = &state.config.checkout;
    let origin = req.origin.as_deref().unwrap_or(&cfg.fallback_origin);
    let session_request = CheckoutSessionRequest::for_plan(plan, origin, cfg);

    match state.upstreams.payments.create_session(&session_request).await {
        Ok(session) => match session.url {
            Some(url) => {
                logger::log_relay(ROUTE, client, 200, &format!("plan={plan} session={}", session.id));
                json_response(StatusCode::OK, &serde_json::json!({ "url": url }))
            }
            None => {
                logger::log_relay(ROUTE, client, 500, &format!("session {} has no url", session.id));
                error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_STRIPE_ERROR)
            }
        },
        Err(e) => {
            logger::log_relay(ROUTE, client, 500, &e.to_string());
            error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_STRIPE_ERROR)
        }
    }
}
