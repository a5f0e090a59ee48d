//! API gateway binary.
//!
//! ```text
//!     Client ──▶ http::server ──▶ routing (prefix → service)
//!                                    │
//!                                    ▼
//!                     proxy::gateway (method check, breaker, fallback)
//!                                    │
//!                                    ▼
//!                     proxy::forwarder ──▶ load_balancer (round robin)
//!                                    │
//!                                    ▼
//!                     proxy::transport ──▶ backend instance
//!
//!     health::active probes every instance and updates the registry
//! ```

use std::path::PathBuf;
use clap::Parser;
use tokio::net::TcpListener;

use api_gateway::config::{load_config, GatewayConfig};
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::{wait_for_signal, Shutdown};
use api_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "api-gateway")]
#[command(about = "HTTP API gateway with failover, health checks and circuit breaking", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");
    tracing::info!(
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        user_instances = config.services.user.instances_or_single().len(),
        notification_instances = config.services.notification.instances_or_single().len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let server = HttpServer::new(config);
    let server_task = tokio::spawn(server.run(listener, server_shutdown));

    wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
