//! netsdr - NetSDR client test bench
//!
//! Runs a TCP echo server in place of a device control port and streams
//! sequenced data items over UDP the way a receiver does.

use netsdr_server::{Config, EchoServer, ServerConfig, UdpTimedSender};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if NETSDR_CONFIG is set, then env overrides)
    let config_path = std::env::var("NETSDR_CONFIG").ok();
    let config = match Config::load() {
        Ok(c) => {
            if let Some(ref path) = config_path {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // If a config file was explicitly specified, fail on error
            if config_path.is_some() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::warn!("Invalid environment configuration ({}), using defaults", e);
            Config::default()
        }
    };

    tracing::info!("Starting netsdr test bench");
    tracing::info!("  Echo address: {}", config.network.bind_addr);
    tracing::info!("  Max connections: {}", config.network.max_connections);

    let server = Arc::new(EchoServer::new(ServerConfig::from(&config.network)));

    let sender = if config.sender.enabled {
        tracing::info!(
            "  UDP sender: {} every {} ms",
            config.sender.target_addr,
            config.sender.interval_ms
        );
        let sender = UdpTimedSender::new(config.sender.clone());
        sender.start().await?;
        Some(sender)
    } else {
        tracing::info!("  UDP sender: disabled");
        None
    };

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    if let Some(sender) = sender {
        sender.stop();
    }

    tracing::info!("Test bench stopped");
    Ok(())
}
