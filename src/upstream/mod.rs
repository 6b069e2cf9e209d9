//! Upstream relays
//!
//! One trait per external service, each with a `reqwest` implementation.
//! A relay performs exactly one outbound call: no retries, nothing persisted.

mod error;
pub mod listmonk;
pub mod resend;
pub mod stripe;

pub use error::UpstreamError;
pub use listmonk::{ListmonkClient, MailingList, SubscriptionOutcome};
pub use resend::{EmailSender, OutboundEmail, ResendClient};
pub use stripe::{CheckoutGateway, CheckoutSessionRequest, StripeClient};

use std::time::Duration;

/// HTTP client shared by the relays: bounded, never follows redirects
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Join a base URL and a path without doubling the slash
fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Local HTTP server standing in for an upstream API
#[cfg(test)]
pub(crate) mod test_server {
    use http_body_util::{BodyExt, Full};
    use hyper::body::{Bytes, Incoming};
    use hyper::header::CONTENT_TYPE;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{HeaderMap, Method, Request, Response};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// One request as the upstream saw it
    #[derive(Debug, Clone)]
    pub struct Captured {
        pub method: Method,
        pub path: String,
        pub headers: HeaderMap,
        pub body: String,
    }

    /// Answers every request with the same status and body
    pub struct FakeUpstream {
        pub base_url: String,
        requests: Arc<Mutex<Vec<Captured>>>,
    }

    impl FakeUpstream {
        pub async fn start(status: u16, body: &'static str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&requests);

            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let log = Arc::clone(&log);
                    tokio::spawn(async move {
                        let service = service_fn(move |req: Request<Incoming>| {
                            let log = Arc::clone(&log);
                            async move {
                                let method = req.method().clone();
                                let path = req.uri().path().to_string();
                                let headers = req.headers().clone();
                                let bytes = req.into_body().collect().await.unwrap().to_bytes();
                                log.lock().unwrap().push(Captured {
                                    method,
                                    path,
                                    headers,
                                    body: String::from_utf8_lossy(&bytes).into_owned(),
                                });
                                let content_type = if body.starts_with('{') {
                                    "application/json"
                                } else {
                                    "text/plain"
                                };
                                let resp = Response::builder()
                                    .status(status)
                                    .header(CONTENT_TYPE, content_type)
                                    .body(Full::new(Bytes::from_static(body.as_bytes())))
                                    .unwrap();
                                Ok::<_, Infallible>(resp)
                            }
                        });
                        let _ = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await;
                    });
                }
            });

            Self {
                base_url: format!("http://{addr}"),
                requests,
            }
        }

        /// The single request received so far
        pub fn only_request(&self) -> Captured {
            let requests = self.requests.lock().unwrap();
            assert_eq!(requests.len(), 1, "{requests:?}");
            requests[0].clone()
        }
    }

    /// Direct connections only, whatever proxy the environment sets
    pub fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        assert_eq!(endpoint("https://api.resend.com", "/emails"), "https://api.resend.com/emails");
        assert_eq!(endpoint("https://api.resend.com/", "emails"), "https://api.resend.com/emails");
        assert_eq!(
            endpoint("https://lists.example.com/", "/subscription/form"),
            "https://lists.example.com/subscription/form"
        );
    }
}
