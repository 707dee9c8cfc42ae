//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router that sends every request to the `RequestHandler`
//! - Wire up middleware (request ID, tracing)
//!   The request ID goes upstream and into the trace span only; responses
//!   carry exactly the headers the handler built
//! - Bind server to listener
//! - Graceful shutdown on the lifecycle broadcast

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::SetRequestIdLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::handler::RequestHandler;
use crate::http::request::{request_id_of, MakeRequestUuidV4};
use crate::http::transport::{HyperTransport, ProxyTransport, TransportError};

/// HTTP server for the pass-through proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server forwarding through `transport`.
    pub fn new(config: ProxyConfig, transport: Arc<dyn ProxyTransport>) -> Self {
        let handler = RequestHandler::new(transport);
        let router = Self::build_router(handler);
        Self { router, config }
    }

    /// Create a server with a `HyperTransport` built from `config`.
    pub fn from_config(config: ProxyConfig) -> Result<Self, TransportError> {
        let transport = Arc::new(HyperTransport::from_config(&config)?);
        Ok(Self::new(config, transport))
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The handler does its own health matching, so every method and path
    /// lands on the fallback.
    fn build_router(handler: RequestHandler) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(Arc::new(handler))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id_of(request),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch(
    State(handler): State<Arc<RequestHandler>>,
    request: Request<Body>,
) -> Response<Body> {
    handler.handle(request).await
}
