//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`] with
//! request tracing and, when enabled, permissive CORS.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` and `GET /ws` -- `WebSocket` subscriber stream
/// - `POST /set-sensor` -- select the active sensor
/// - `GET /get-sensor` -- read the active sensor
/// - `POST /sensor-data` -- report a reading
/// - `GET /status` -- relay status
///
/// Producers are embedded devices on the local network and dashboards are
/// served from elsewhere, so CORS allows any origin unless configured off.
pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        // WebSocket (bare root kept for existing clients)
        .route("/", get(ws::ws_subscribe))
        .route("/ws", get(ws::ws_subscribe))
        // REST API
        .route("/set-sensor", post(handlers::set_sensor))
        .route("/get-sensor", get(handlers::get_sensor))
        .route("/sensor-data", post(handlers::sensor_data))
        .route("/status", get(handlers::status))
        .fallback(handlers::not_found);

    let router = if state.cors_permissive {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
