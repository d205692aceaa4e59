//! REST endpoint handlers.
//!
//! Routes and response bodies match what deployed sensor producers and
//! dashboards already speak.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/set-sensor` | Select the active sensor and broadcast it |
//! | `GET` | `/get-sensor` | Current selection |
//! | `POST` | `/sensor-data` | Broadcast a sensor reading |
//! | `GET` | `/status` | Selection, subscriber count, server time |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::Uri;
use axum::response::IntoResponse;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /set-sensor`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSensorRequest {
    /// Sensor to select. Any string is accepted.
    pub sensor: String,
}

/// Request body for `POST /sensor-data`.
#[derive(Debug, serde::Deserialize)]
pub struct SensorDataRequest {
    /// Sensor that produced the reading.
    pub sensor: String,
    /// Reading value, forwarded as-is.
    pub value: serde_json::Value,
}

/// Response for selection reads and writes.
#[derive(Debug, serde::Serialize)]
struct SelectionResponse {
    /// Human-readable message, omitted on reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    /// The selected sensor.
    sensor: String,
}

/// Acknowledgment for `POST /sensor-data`.
#[derive(Debug, serde::Serialize)]
struct AckResponse {
    message: &'static str,
}

// ---------------------------------------------------------------------------
// POST /set-sensor
// ---------------------------------------------------------------------------

/// Select the active sensor and broadcast the change.
pub async fn set_sensor(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SetSensorRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let sensor = state.relay.set_selection(request.sensor);

    Ok(Json(SelectionResponse {
        message: Some("Sensor updated"),
        sensor,
    }))
}

// ---------------------------------------------------------------------------
// GET /get-sensor
// ---------------------------------------------------------------------------

/// Return the current selection.
pub async fn get_sensor(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(SelectionResponse {
        message: None,
        sensor: state.relay.selection(),
    })
}

// ---------------------------------------------------------------------------
// POST /sensor-data
// ---------------------------------------------------------------------------

/// Broadcast a reading to every subscriber.
pub async fn sensor_data(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SensorDataRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    info!(sensor = %request.sensor, value = %request.value, "sensor data received");
    state.relay.report_reading(request.sensor, request.value);

    Ok(Json(AckResponse {
        message: "Data received",
    }))
}

// ---------------------------------------------------------------------------
// GET /status
// ---------------------------------------------------------------------------

/// Introspection: selection, subscriber count, and server time.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.relay.status())
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Answer unknown routes with a JSON 404.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
