//! Events fanned out to subscribers and messages accepted from them.
//!
//! The JSON shape is fixed by deployed producers and dashboards: a `type`
//! discriminant (`SENSOR_UPDATE` or `SENSOR_DATA`) followed by the
//! kind-specific fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Selection value reported before any sensor has been selected.
pub const NO_SELECTION: &str = "NONE";

/// A broadcast event.
///
/// Constructed once per trigger and serialized once before fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export, export_to = "bindings/")]
pub enum Event {
    /// The active sensor selection changed (or is being replayed to a new
    /// subscriber).
    #[serde(rename = "SENSOR_UPDATE")]
    SelectionChanged {
        /// Name of the selected sensor.
        sensor: String,
    },

    /// A producer reported a reading.
    #[serde(rename = "SENSOR_DATA")]
    ReadingReported {
        /// Name of the sensor that produced the reading.
        sensor: String,
        /// The reading, passed through untouched.
        value: serde_json::Value,
        /// Server-assigned receive time.
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Build a selection change event.
    pub fn selection(sensor: impl Into<String>) -> Self {
        Self::SelectionChanged {
            sensor: sensor.into(),
        }
    }

    /// Build a reading event stamped with the current time.
    pub fn reading(sensor: impl Into<String>, value: serde_json::Value) -> Self {
        Self::ReadingReported {
            sensor: sensor.into(),
            value,
            timestamp: Utc::now(),
        }
    }

    /// The wire discriminant of this event.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SelectionChanged { .. } => "SENSOR_UPDATE",
            Self::ReadingReported { .. } => "SENSOR_DATA",
        }
    }

    /// The sensor this event refers to.
    pub fn sensor(&self) -> &str {
        match self {
            Self::SelectionChanged { sensor } | Self::ReadingReported { sensor, .. } => sensor,
        }
    }
}

/// A message a subscriber may send over its streaming connection.
///
/// Anything that does not parse into one of these variants is ignored by
/// the relay.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Request to change the active selection.
    #[serde(rename = "SENSOR_UPDATE")]
    SelectionUpdate {
        /// Name of the sensor to select.
        sensor: String,
    },
}

impl InboundMessage {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the frame is not a recognized message.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Read-only introspection of the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StatusReport {
    /// Current selection, or [`NO_SELECTION`].
    pub selection: String,
    /// Number of registered subscribers.
    pub subscriber_count: usize,
    /// Time the report was taken.
    pub timestamp: DateTime<Utc>,
}
