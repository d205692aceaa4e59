//! The single process-wide sensor selection.

use obsentra_types::NO_SELECTION;
use parking_lot::RwLock;

/// Holds the currently selected sensor.
///
/// Writes always overwrite; no format validation is applied. Broadcasting
/// the change is the job of [`Relay`](crate::Relay), which sequences the
/// write ahead of the fan-out.
#[derive(Debug, Default)]
pub struct SelectionCell {
    current: RwLock<Option<String>>,
}

impl SelectionCell {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current selection.
    pub fn set(&self, sensor: impl Into<String>) {
        *self.current.write() = Some(sensor.into());
    }

    /// Current selection, or [`NO_SELECTION`] if nothing was ever set.
    pub fn get(&self) -> String {
        self.current
            .read()
            .clone()
            .unwrap_or_else(|| NO_SELECTION.to_owned())
    }
}
