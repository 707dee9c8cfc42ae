//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, outcome;
//!   non-standard methods are labelled `OTHER`
//! - `proxy_request_duration_seconds` (histogram): handler latency
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so the handler
//!   records unconditionally
//! - Prometheus exposition only when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// How a request left the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Answered locally on the health path.
    Health,
    /// The upstream response was passed through.
    Proxied,
    /// The transport failed and a 502 was synthesized.
    TransportError,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Health => "health",
            Outcome::Proxied => "proxied",
            Outcome::TransportError => "transport_error",
        }
    }
}

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Bound the method label: extension methods collapse to `OTHER`.
fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "CONNECT" => "CONNECT",
        "OPTIONS" => "OPTIONS",
        "TRACE" => "TRACE",
        "PATCH" => "PATCH",
        _ => "OTHER",
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, outcome: Outcome, start: Instant) {
    let method = method_label(method);
    metrics::counter!(
        "proxy_requests_total",
        "method" => method,
        "status" => status.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    metrics::histogram!(
        "proxy_request_duration_seconds",
        "method" => method,
        "outcome" => outcome.as_str()
    )
    .record(start.elapsed().as_secs_f64());
}
