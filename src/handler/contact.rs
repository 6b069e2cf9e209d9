//! Contact form relay: one email per valid submission

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde_json::Value;

use super::RelayRequest;
use crate::config::AppState;
use crate::http::{error_response, json_response};
use crate::logger;
use crate::upstream::OutboundEmail;
use crate::validation::{validate_contact, ContactInput};

pub const ROUTE: &str = "contact";
pub const MSG_PROCESSING_ERROR: &str = "Error procesando la solicitud.";

pub async fn handle_contact(req: &RelayRequest, state: &AppState) -> Response<Full<Bytes>> {
    let Ok(body) = serde_json::from_slice::<Value>(&req.body) else {
        logger::log_relay(ROUTE, &req.client_addr, 500, "malformed JSON body");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_PROCESSING_ERROR);
    };

    let message = match validate_contact(&ContactInput::from_json(&body)) {
        Ok(m) => m,
        Err(e) => {
            logger::log_relay(ROUTE, &req.client_addr, 400, "missing fields");
            return error_response(StatusCode::BAD_REQUEST, e.0);
        }
    };

    let email = OutboundEmail::from_contact(&message, &state.config.contact);
    match state.upstreams.mailer.send(&email).await {
        Ok(()) => {
            logger::log_relay(ROUTE, &req.client_addr, 200, "email sent");
            json_response(StatusCode::OK, &serde_json::json!({ "success": true }))
        }
        Err(e) => {
            logger::log_relay(ROUTE, &req.client_addr, 500, &e.to_string());
            let message = e.upstream_message().unwrap_or(MSG_PROCESSING_ERROR);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}
