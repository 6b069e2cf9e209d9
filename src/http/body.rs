//! Request extraction helpers
//!
//! Body collection under a size cap, client address and origin lookup.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::Request;
use std::net::SocketAddr;

/// Key used when no client address is known
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {0} bytes")]
    TooLarge(u64),
    #[error("failed to read request body: {0}")]
    Read(String),
}

/// Collect the whole body, refusing anything over `limit` bytes
pub async fn read_body<B>(body: B, limit: u64) -> Result<Bytes, BodyError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let cap = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, cap).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(BodyError::TooLarge(limit)),
        Err(e) => Err(BodyError::Read(e.to_string())),
    }
}

/// Declared `Content-Length` above the cap, checked before reading
pub fn declared_length_exceeds<B>(req: &Request<B>, limit: u64) -> bool {
    req.headers()
        .get(hyper::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|len| len > limit)
}

/// Address the rate limiter keys on.
///
/// Behind a trusted proxy the first `X-Forwarded-For` entry wins; otherwise
/// the TCP peer's IP. Ports are dropped so reconnects share a window.
pub fn client_address<B>(req: &Request<B>, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }
    }
    peer.map_or_else(|| UNKNOWN_CLIENT.to_string(), |p| p.ip().to_string())
}

/// `Origin` header, ignoring the opaque `null` origin
pub fn origin<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(hyper::header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "null")
        .map(ToString::to_string)
}

/// `User-Agent` header for access logs
pub fn user_agent<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(hyper::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}
