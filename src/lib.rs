//! Pass-through HTTP proxy library.
//!
//! Answers `/health` locally and forwards every other request to a single
//! upstream through a pluggable [`ProxyTransport`]. Transport failures become
//! `502 Bad Gateway` responses carrying the error text.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::{HttpServer, ProxyTransport, RequestHandler, TransportError};
pub use lifecycle::Shutdown;
