//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → handler.rs (health shortcut or forward)
//!     → transport.rs (upstream call)
//!     → handler.rs (pass through or 502)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod server;
pub mod transport;

pub use handler::{RequestHandler, HEALTH_PATH, PROXY_ERROR_PREFIX};
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::HttpServer;
pub use transport::{HyperTransport, ProxyTransport, TransportError};
