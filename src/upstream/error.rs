use thiserror::Error;

/// Failure of a single upstream call
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Connection, TLS, timeout or body read failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered and refused the request
    #[error("upstream rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the service.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// The service answered 2xx with a body we cannot use
    #[error("unexpected upstream response: {0}")]
    Decode(String),

    /// Credential missing from the environment
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl UpstreamError {
    /// Message from the service itself, when it sent one
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}
