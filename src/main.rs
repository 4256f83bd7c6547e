//! Breach Alerts Server
//!
//! Run with: cargo run
//!
//! See `breach_alerts::config` for the environment variables read at startup.
//! RUST_LOG sets the log level (default: breach_alerts=info,tower_http=info).

use breach_alerts::api::{run_server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "breach_alerts=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    tracing::info!("Breach Alerts configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    match &config.data_file {
        Some(path) => tracing::info!("  Data file: {}", path.display()),
        None => tracing::info!("  Data file: none (in-memory)"),
    }
    tracing::info!("  User service: {}", config.user_service_uri);
    tracing::info!("  Heartbeat interval: {:?}", config.heartbeat_interval);
    tracing::info!("  Delivery timeout: {:?}", config.delivery_timeout);
    tracing::info!("  Stream client buffer: {} frames", config.client_buffer);

    run_server(config).await
}
