//! HTTP protocol layer module
//!
//! Response builders and request extraction helpers, kept apart from the
//! relay logic so handlers only deal in typed values.

pub mod body;
pub mod response;

// Re-export commonly used items
pub use body::{client_address, declared_length_exceeds, origin, read_body, user_agent, BodyError};
pub use response::{
    apply_cors, build_404_response, build_405_response, build_413_response, build_health_response,
    build_options_response, error_response, json_response, with_retry_after,
};
