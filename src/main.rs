//! Caching Gateway (v1)
//!
//! A caching HTTP gateway built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                 CACHING GATEWAY                  │
//!                      │                                                  │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│ routing  │──▶│   strategy   │  │
//!                      │  │ server  │   │  engine  │   │    engine    │  │
//!                      │  └─────────┘   └──────────┘   └──────┬───────┘  │
//!                      │                                      │          │
//!                      │                     ┌────────────────┴───────┐  │
//!                      │                     ▼                        ▼  │
//!   Client Response    │  ┌─────────┐   ┌────────────┐   ┌─────────────┐ │
//!   ◀──────────────────┼──│ response│◀──│   cache    │   │    fetch    │─┼──▶ Origin
//!                      │  │  path   │   │  wrapper   │   │   wrapper   │ │    Server
//!                      │  └─────────┘   └─────┬──────┘   └─────────────┘ │
//!                      │                      ▼                          │
//!                      │                ┌────────────┐                   │
//!                      │                │ persistent │                   │
//!                      │                │   caches   │                   │
//!                      │                └────────────┘                   │
//!                      │                                                 │
//!                      │  ┌───────────────────────────────────────────┐  │
//!                      │  │           Cross-Cutting Concerns          │  │
//!                      │  │  config · plugins · observability ·       │  │
//!                      │  │  resilience · lifecycle                   │  │
//!                      │  └───────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use tokio::net::TcpListener;

use caching_gateway::config::{load_config, GatewayConfig};
use caching_gateway::http::HttpServer;
use caching_gateway::lifecycle::{signals, Shutdown};
use caching_gateway::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration before logging so the format setting applies.
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&PathBuf::from(path))?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(config.observability.log_format);

    tracing::info!("caching-gateway v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.upstream.origin,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let server = HttpServer::new(config)?;
    let background = server.background();
    let shutdown = Shutdown::new();

    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    signals::wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    // Anchored background cache writes get a chance to settle.
    shutdown.drain(&background, Duration::from_secs(10)).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
