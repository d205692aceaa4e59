//! The broadcast mediator and connection lifecycle.
//!
//! Every state change and every fan-out goes through [`Relay`]. A single
//! sequencing lock is held from the selection write through the end of the
//! fan-out, which gives two guarantees:
//!
//! - a subscriber never sees a selection event older than the stored
//!   selection it could read afterwards;
//! - every subscriber receives events in the order they were published.
//!
//! Delivery is a non-blocking queue push, so the lock is never held across
//! network I/O.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use chrono::Utc;
use obsentra_types::{Event, InboundMessage, StatusReport, SubscriberId};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::registry::SubscriberRegistry;
use crate::selection::SelectionCell;
use crate::subscriber::Subscriber;

/// Outcome of one fan-out, used for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FanOut {
    delivered: usize,
    pruned: usize,
}

/// Shared relay context handed to every ingress adapter.
#[derive(Debug, Default)]
pub struct Relay {
    selection: SelectionCell,
    registry: SubscriberRegistry,
    sequence: Mutex<()>,
    closing: AtomicBool,
}

impl Relay {
    /// Create a relay with no selection and no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Store a new selection and broadcast it to every subscriber.
    ///
    /// Returns the accepted value.
    pub fn set_selection(&self, sensor: impl Into<String>) -> String {
        let sensor = sensor.into();
        let _guard = self.sequence.lock();
        self.selection.set(sensor.clone());
        info!(sensor = %sensor, "sensor selection updated");
        let _ = self.fan_out(&Event::selection(sensor.clone()));
        sensor
    }

    /// Current selection, or `"NONE"` if nothing was selected yet.
    pub fn selection(&self) -> String {
        self.selection.get()
    }

    // -----------------------------------------------------------------------
    // Readings and generic publish
    // -----------------------------------------------------------------------

    /// Stamp a reading with the current time and broadcast it.
    pub fn report_reading(&self, sensor: impl Into<String>, value: serde_json::Value) {
        let event = Event::reading(sensor, value);
        debug!(sensor = event.sensor(), "sensor reading received");
        self.publish(&event);
    }

    /// Deliver an event to every registered subscriber.
    ///
    /// Subscribers that are closed or reject the payload are removed.
    /// Failures are never reported to the caller.
    pub fn publish(&self, event: &Event) {
        let _guard = self.sequence.lock();
        let _ = self.fan_out(event);
    }

    /// Serialize once, push to every subscriber in a snapshot of the
    /// registry, then drop the ones that failed.
    ///
    /// Callers must hold `sequence`.
    fn fan_out(&self, event: &Event) -> FanOut {
        let payload = match serde_json::to_vec(event) {
            Ok(json) => Bytes::from(json),
            Err(e) => {
                warn!(kind = event.kind(), error = %e, "failed to serialize event");
                return FanOut::default();
            }
        };

        let mut outcome = FanOut::default();
        let mut dead = Vec::new();
        for subscriber in self.registry.snapshot() {
            if !subscriber.is_open() {
                dead.push(subscriber);
                continue;
            }
            match subscriber.send(payload.clone()) {
                Ok(()) => outcome.delivered = outcome.delivered.saturating_add(1),
                Err(e) => {
                    debug!(subscriber_id = %subscriber.id(), error = %e, "delivery failed");
                    dead.push(subscriber);
                }
            }
        }

        for subscriber in dead {
            let _ = self.registry.unregister(subscriber.id());
            subscriber.close();
            outcome.pruned = outcome.pruned.saturating_add(1);
        }

        debug!(
            kind = event.kind(),
            recipients = outcome.delivered,
            pruned = outcome.pruned,
            "event broadcast"
        );
        outcome
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Register a freshly accepted subscriber and greet it with the current
    /// selection.
    ///
    /// The greeting is queued before any later broadcast can reach the
    /// subscriber. If it cannot be queued the subscriber is dropped again.
    /// After [`shut_down`](Self::shut_down) every new subscriber is closed
    /// without being registered.
    pub fn accept(&self, subscriber: Arc<dyn Subscriber>) {
        let _guard = self.sequence.lock();
        let id = subscriber.id();
        if self.closing.load(Ordering::Acquire) {
            debug!(subscriber_id = %id, "relay shut down, refusing subscriber");
            subscriber.close();
            return;
        }
        self.registry.register(Arc::clone(&subscriber));

        let greeting = Event::selection(self.selection.get());
        let delivered = match serde_json::to_vec(&greeting) {
            Ok(json) => subscriber.send(Bytes::from(json)).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match delivered {
            Ok(()) => info!(subscriber_id = %id, "subscriber connected"),
            Err(e) => {
                warn!(subscriber_id = %id, error = %e, "failed to greet subscriber, dropping it");
                let _ = self.registry.unregister(id);
                subscriber.close();
            }
        }
    }

    /// Handle a text message received from a subscriber.
    ///
    /// Selection updates take the same path as [`set_selection`](Self::set_selection),
    /// so the change is rebroadcast to every subscriber including the
    /// sender. Anything unrecognized is logged and ignored.
    pub fn handle_inbound(&self, from: SubscriberId, text: &str) {
        match InboundMessage::parse(text) {
            Ok(InboundMessage::SelectionUpdate { sensor }) => {
                debug!(subscriber_id = %from, sensor = %sensor, "selection update from subscriber");
                let _ = self.set_selection(sensor);
            }
            Err(e) => {
                debug!(subscriber_id = %from, error = %e, "ignoring unrecognized message");
            }
        }
    }

    /// Tear down a subscriber after its transport closed or errored.
    ///
    /// Safe to call any number of times and while a broadcast is running.
    pub fn disconnect(&self, id: SubscriberId) {
        if let Some(subscriber) = self.registry.unregister(id) {
            subscriber.close();
            info!(subscriber_id = %id, "subscriber disconnected");
        }
    }

    /// Disconnect every subscriber currently registered.
    pub fn disconnect_all(&self) {
        for subscriber in self.registry.snapshot() {
            self.disconnect(subscriber.id());
        }
    }

    /// Stop accepting subscribers and disconnect the current ones.
    ///
    /// Upgrades that complete afterwards are closed in [`accept`](Self::accept),
    /// so nothing can register once shutdown has begun.
    pub fn shut_down(&self) {
        {
            let _guard = self.sequence.lock();
            self.closing.store(true, Ordering::Release);
        }
        self.disconnect_all();
        info!("relay shut down");
    }

    /// Whether [`shut_down`](Self::shut_down) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Read-only status snapshot.
    pub fn status(&self) -> StatusReport {
        StatusReport {
            selection: self.selection.get(),
            subscriber_count: self.registry.len(),
            timestamp: Utc::now(),
        }
    }
}
