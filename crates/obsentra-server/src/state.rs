//! Shared application state for the relay server.

use std::sync::Arc;

use obsentra_core::{Relay, RelayConfig};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The broadcast domain all handlers operate on.
    pub relay: Arc<Relay>,
    /// Outbound queue size for each new `WebSocket` subscriber.
    pub subscriber_queue_capacity: usize,
    /// Whether to answer CORS requests from any origin.
    pub cors_permissive: bool,
}

impl AppState {
    /// Create state around a relay using default settings.
    pub fn new(relay: Arc<Relay>) -> Self {
        Self::from_config(relay, &RelayConfig::default())
    }

    /// Create state around a relay using loaded configuration.
    pub fn from_config(relay: Arc<Relay>, config: &RelayConfig) -> Self {
        Self {
            relay,
            subscriber_queue_capacity: config.relay.subscriber_queue_capacity,
            cors_permissive: config.server.cors_permissive,
        }
    }
}
