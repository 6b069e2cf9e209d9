//! Request handler module
//!
//! The router picks a relay by path; each relay validates, makes one
//! upstream call and maps the result to a JSON response.

pub mod checkout;
pub mod contact;
pub mod newsletter;
pub mod router;

use hyper::body::Bytes;

// Re-export main entry point
pub use router::handle_request;

/// What a relay handler sees of the HTTP request
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub body: Bytes,
    /// Rate-limit key: client IP, or `unknown`
    pub client_addr: String,
    pub origin: Option<String>,
}
