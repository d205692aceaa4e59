//! Obsentra relay binary.
//!
//! Relays sensor selections and readings from HTTP producers to
//! `WebSocket` subscribers.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`OBSENTRA_CONFIG` or `obsentra-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Create the relay and application state
//! 4. Serve until `Ctrl-C`

use std::path::PathBuf;
use std::sync::Arc;

use obsentra_core::config::{DEFAULT_CONFIG_FILE, LoggingConfig};
use obsentra_core::{LogFormat, Relay, RelayConfig};
use obsentra_server::{AppState, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point for the relay.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or the server fails
/// to bind or serve.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so errors surface
    //    through the returned error only.
    let config_path = std::env::var("OBSENTRA_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
    let config = RelayConfig::load(&config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        config_path = %config_path.display(),
        host = config.server.host,
        port = config.server.port,
        subscriber_queue_capacity = config.relay.subscriber_queue_capacity,
        "obsentra starting"
    );

    // 3. Create the relay.
    let relay = Arc::new(Relay::new());
    let state = Arc::new(AppState::from_config(relay, &config));

    // 4. Serve.
    start_server(&config.server, state).await?;

    info!("obsentra shutdown complete");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
