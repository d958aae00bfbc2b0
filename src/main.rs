//! Concrete search relay.
//!
//! Exposes Concrete fetch and search services, which speak framed Thrift
//! over raw sockets, to browsers over HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                        RELAY                          │
//!   Browser           │  ┌──────────┐   ┌───────────┐   ┌──────────────────┐  │
//!   ──POST (JSON)────▶│─▶│  bridge  │──▶│ processor │──▶│ relay handlers   │  │
//!                     │  │ endpoint │   │ (per svc) │   │ fetch  [cache]   │──┼──▶ fetch backend
//!   ◀─────────────────│◀─│          │◀──│           │◀──│ search           │──┼──▶ search backend
//!                     │  └──────────┘   └───────────┘   │ proxy → registry │──┼──▶ providers
//!                     │                                  └──────────────────┘  │
//!   ──GET /get_sentence_text ──▶ fetch relay ──▶ JSON                           │
//!   ──GET /<path>  ──▶ static files                                             │
//!                     │                                                        │
//!                     │  config · observability · lifecycle                    │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use tokio::net::TcpListener;

use concrete_relay::config::CliArgs;
use concrete_relay::lifecycle::signals::spawn_signal_handler;
use concrete_relay::observability::{logging, metrics};
use concrete_relay::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliArgs::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "concrete-relay starting");
    tracing::info!(
        listen = %config.listener.bind_address(),
        fetch_backend = %config.fetch_backend.address(),
        search_backend = %config.search_backend.address(),
        providers = config.providers.len() + 1,
        backend_protocol = %config.backend.protocol,
        bridge_protocol = %config.bridge.protocol,
        cache_capacity = config.cache.capacity,
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

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
