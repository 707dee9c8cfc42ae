//! Request dispatch and response translation.
//!
//! # Responsibilities
//! - Answer the liveness probe locally
//! - Forward everything else through the `ProxyTransport`
//! - Map transport failures to 502 Bad Gateway
//! - Pass upstream responses through untouched
//!
//! # Design Decisions
//! - Health match is on the exact path only, any method
//! - Every transport failure gets the same 502, with the error text exposed
//! - The upstream body is moved into the outbound body, so it is released
//!   whenever the outbound body is dropped, whether fully sent or not
//! - The response value is assembled in one step; headers cannot change
//!   after the status is fixed

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};

use crate::http::transport::{ProxyTransport, TransportError};
use crate::observability::metrics::{self, Outcome};

/// Liveness probe path, answered without touching the upstream.
pub const HEALTH_PATH: &str = "/health";

/// Body of the health response.
pub const HEALTH_BODY: &str = "OK";

/// Prefix of the 502 body; the transport error text follows it.
pub const PROXY_ERROR_PREFIX: &str = "unable to proxy request - ";

/// Stateless dispatcher in front of a shared transport.
#[derive(Clone)]
pub struct RequestHandler {
    transport: Arc<dyn ProxyTransport>,
}

impl RequestHandler {
    pub fn new(transport: Arc<dyn ProxyTransport>) -> Self {
        Self { transport }
    }

    /// Handle one request. Always produces a response.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let method = request.method().clone();

        if request.uri().path() == HEALTH_PATH {
            metrics::record_request(method.as_str(), StatusCode::OK.as_u16(), Outcome::Health, start);
            return health_response();
        }

        let path = request.uri().path().to_owned();
        match self.transport.execute(request).await {
            Ok(upstream) => {
                let response = passthrough_response(upstream);
                tracing::debug!(
                    method = %method,
                    path = %path,
                    status = response.status().as_u16(),
                    "Proxied request"
                );
                metrics::record_request(
                    method.as_str(),
                    response.status().as_u16(),
                    Outcome::Proxied,
                    start,
                );
                response
            }
            Err(error) => {
                tracing::warn!(
                    method = %method,
                    path = %path,
                    error = %error,
                    "Unable to proxy request"
                );
                metrics::record_request(
                    method.as_str(),
                    StatusCode::BAD_GATEWAY.as_u16(),
                    Outcome::TransportError,
                    start,
                );
                bad_gateway(&error)
            }
        }
    }
}

fn health_response() -> Response<Body> {
    Response::new(Body::from(HEALTH_BODY))
}

fn bad_gateway(error: &TransportError) -> Response<Body> {
    let mut response = Response::new(Body::from(format!("{PROXY_ERROR_PREFIX}{error}")));
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    response
}

fn passthrough_response(upstream: Response<Body>) -> Response<Body> {
    let (parts, body) = upstream.into_parts();
    let mut response = Response::new(body);
    *response.headers_mut() = parts.headers;
    *response.status_mut() = parts.status;
    response
}
