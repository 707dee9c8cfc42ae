//! Pass-through proxy (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ server ─▶ handler ──┬─ /health ─▶ 200 OK   │
//!                           │                       │                      │
//!                           │                       └─▶ transport ─────────┼──▶ Upstream
//!     Client Response       │                               │              │
//!     ◀─────────────────────┼── pass through / 502 ◀────────┘              │
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use passthrough_proxy::config::{resolve_config, ConfigOverrides};
use passthrough_proxy::lifecycle::{wait_for_signal, Shutdown};
use passthrough_proxy::observability::{logging, metrics};
use passthrough_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "passthrough-proxy", version)]
#[command(about = "Forward HTTP requests to one upstream, answering /health locally", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream base URL, overriding the config file.
    #[arg(long, env = "PROXY_UPSTREAM_URL")]
    upstream: Option<String>,

    /// Listener bind address, overriding the config file.
    #[arg(long, env = "PROXY_BIND_ADDRESS")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(
        cli.config.as_deref(),
        ConfigOverrides {
            upstream_url: cli.upstream,
            bind_address: cli.bind,
        },
    )?;

    logging::init_logging(&config.observability);

    tracing::info!("passthrough-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        connect_timeout_secs = config.timeouts.connect_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::from_config(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
