//! Upstream transport.
//!
//! # Responsibilities
//! - Define the `ProxyTransport` capability the handler forwards through
//! - Provide the production implementation over the hyper-util client
//! - Rewrite the request URI and Host header for the upstream
//! - Bound the wait for upstream response headers
//!
//! # Design Decisions
//! - The handler only sees `Result<Response, TransportError>`; an error never
//!   carries a partial response
//! - Response bodies are streamed, never buffered
//! - No retries, no pooling policy beyond the client's defaults

use std::error::Error as StdError;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{header, HeaderValue, Request, Response, Uri, Version};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::config::ProxyConfig;

/// Anything that can execute an HTTP request against the upstream.
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    /// Forward `request` and return the upstream response, or why there is none.
    async fn execute(&self, request: Request<Body>) -> Result<Response<Body>, TransportError>;
}

/// Failure to obtain a response from the upstream.
///
/// The display text is what clients see in the 502 body.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{}", error_chain(.0))]
    Request(hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("invalid upstream uri: {0}")]
    InvalidUri(String),

    #[error("{0}")]
    Other(String),
}

/// Flatten an error and its sources into `outer: inner: root`.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Parsed upstream base URL.
#[derive(Debug, Clone)]
struct Upstream {
    scheme: Scheme,
    authority: Authority,
    /// Base path without trailing slash; empty for the root.
    base_path: String,
}

impl Upstream {
    fn parse(raw: &str) -> Result<Self, TransportError> {
        let url = Url::parse(raw).map_err(|e| TransportError::InvalidUri(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidUri(format!("{raw}: missing host")))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: Scheme::from_str(url.scheme())
                .map_err(|e| TransportError::InvalidUri(e.to_string()))?,
            authority: Authority::from_str(&authority)
                .map_err(|e| TransportError::InvalidUri(e.to_string()))?,
            base_path: url.path().trim_end_matches('/').to_string(),
        })
    }

    /// Point `original` at the upstream, keeping its path and query.
    fn target_uri(&self, original: &Uri) -> Result<Uri, TransportError> {
        let path_and_query = original
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let separator = if path_and_query.starts_with('/') { "" } else { "/" };

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(format!("{}{}{}", self.base_path, separator, path_and_query))
            .build()
            .map_err(|e| TransportError::InvalidUri(e.to_string()))
    }
}

/// `ProxyTransport` over a hyper-util legacy client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    upstream: Upstream,
    request_timeout: Duration,
}

impl HyperTransport {
    /// Create a transport forwarding to `upstream_url`.
    pub fn new(
        upstream_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let upstream = Upstream::parse(upstream_url)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            upstream,
            request_timeout,
        })
    }

    /// Create a transport from the upstream and timeout sections of `config`.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, TransportError> {
        Self::new(
            &config.upstream.url,
            Duration::from_secs(config.timeouts.connect_secs),
            Duration::from_secs(config.timeouts.request_secs),
        )
    }
}

#[async_trait]
impl ProxyTransport for HyperTransport {
    async fn execute(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = self.upstream.target_uri(&parts.uri)?;
        // Upstream connections are HTTP/1.1 regardless of the client's protocol.
        parts.version = Version::HTTP_11;
        let host = HeaderValue::from_str(self.upstream.authority.as_str())
            .map_err(|e| TransportError::InvalidUri(e.to_string()))?;
        parts.headers.insert(header::HOST, host);

        tracing::trace!(uri = %parts.uri, method = %parts.method, "Forwarding to upstream");

        let response = tokio::time::timeout(
            self.request_timeout,
            self.client.request(Request::from_parts(parts, body)),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.request_timeout))?
        .map_err(TransportError::Request)?;

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
