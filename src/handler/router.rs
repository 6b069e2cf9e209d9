//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: route matching, method checks,
//! body collection and dispatch to the relays.

use crate::config::AppState;
use crate::handler::{checkout, contact, newsletter, RelayRequest};
use crate::http::{self, BodyError};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, SERVER};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

pub const CONTACT_PATH: &str = "/api/contact";
pub const NEWSLETTER_PATH: &str = "/api/newsletter-subscription";
pub const CHECKOUT_PATH: &str = "/api/stripe-session";
pub const LIVENESS_PATH: &str = "/healthz";
pub const READINESS_PATH: &str = "/readyz";

const RELAY_METHODS: &str = "POST, OPTIONS";
const PROBE_METHODS: &str = "GET, HEAD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relay {
    Contact,
    Newsletter,
    Checkout,
}

impl Relay {
    fn for_path(path: &str) -> Option<Self> {
        match path {
            CONTACT_PATH => Some(Self::Contact),
            NEWSLETTER_PATH => Some(Self::Newsletter),
            CHECKOUT_PATH => Some(Self::Checkout),
            _ => None,
        }
    }

    async fn handle(self, req: &RelayRequest, state: &AppState) -> Response<Full<Bytes>> {
        match self {
            Self::Contact => contact::handle_contact(req, state).await,
            Self::Newsletter => newsletter::handle_newsletter(req, state).await,
            Self::Checkout => checkout::handle_checkout(req, state).await,
        }
    }

    /// Each relay keeps its own error body shape, even for a crashed handler
    fn internal_error(self) -> Response<Full<Bytes>> {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        match self {
            Self::Contact => http::error_response(status, contact::MSG_PROCESSING_ERROR),
            Self::Newsletter => newsletter::reply(status, Some(newsletter::MSG_INTERNAL)),
            Self::Checkout => http::error_response(status, checkout::MSG_STRIPE_ERROR),
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: Option<SocketAddr>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let client_addr = http::client_address(&req, peer_addr, state.config.http.trust_forwarded_for);

    let access_log = state.cached_access_log.load(Ordering::Relaxed);
    let mut entry = access_log.then(|| {
        let mut entry = AccessLogEntry::new(
            client_addr.clone(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.origin = http::origin(&req);
        entry.user_agent = http::user_agent(&req);
        entry
    });

    let mut response = route_request(req, &state, client_addr).await;

    // Headers common to every response
    let http_config = &state.config.http;
    if http_config.enable_cors {
        http::apply_cors(&mut response, &http_config.cors_origin);
    }
    if let Ok(server) = HeaderValue::from_str(&http_config.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on path, then method
async fn route_request<B>(
    req: Request<B>,
    state: &Arc<AppState>,
    client_addr: String,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path();

    // 0. CORS preflight, answered for any path
    if *req.method() == Method::OPTIONS {
        return http::build_options_response();
    }

    // 1. Health probes (always fast, never touch upstreams)
    if path == LIVENESS_PATH || path == READINESS_PATH {
        return match *req.method() {
            Method::GET | Method::HEAD => http::build_health_response("ok"),
            _ => http::build_405_response(PROBE_METHODS),
        };
    }

    // 2. Relay lookup
    let Some(relay) = Relay::for_path(path) else {
        logger::log_debug(&format!("No route for {path}"));
        return http::build_404_response();
    };

    // 3. Check HTTP method
    if let Some(resp) = check_http_method(req.method()) {
        return resp;
    }

    // 4. Check declared body size before reading anything
    let max_body_size = state.config.http.max_body_size;
    if http::declared_length_exceeds(&req, max_body_size) {
        logger::log_warning(&format!(
            "Request body too large for {path} (max: {max_body_size})"
        ));
        return http::build_413_response();
    }

    // 5. Collect body, still capped for chunked uploads
    let origin = http::origin(&req);
    let body = match http::read_body(req.into_body(), max_body_size).await {
        Ok(body) => body,
        Err(e @ BodyError::TooLarge(_)) => {
            logger::log_warning(&e.to_string());
            return http::build_413_response();
        }
        Err(e @ BodyError::Read(_)) => {
            logger::log_warning(&e.to_string());
            return http::error_response(StatusCode::BAD_REQUEST, "Bad Request");
        }
    };

    let relay_req = RelayRequest {
        body,
        client_addr,
        origin,
    };
    dispatch(relay, relay_req, Arc::clone(state)).await
}

/// Check HTTP method for relay routes
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::POST => None,
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response(RELAY_METHODS))
        }
    }
}

/// Run the relay on its own task; a panic becomes that relay's 500
async fn dispatch(relay: Relay, req: RelayRequest, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let task = tokio::spawn(async move { relay.handle(&req, &state).await });
    match task.await {
        Ok(resp) => resp,
        Err(e) => {
            logger::log_error(&format!("Relay {relay:?} failed: {e}"));
            relay.internal_error()
        }
    }
}
