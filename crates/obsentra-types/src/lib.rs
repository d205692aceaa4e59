//! Shared type definitions for the Obsentra sensor relay.
//!
//! Everything that crosses the wire between producers, the relay, and
//! streaming subscribers is defined here. Wire types flow downstream to
//! `TypeScript` via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for subscriber identities
//! - [`event`] -- Broadcast events, inbound streaming messages, and the
//!   status report

pub mod event;
pub mod ids;

pub use event::{Event, InboundMessage, NO_SELECTION, StatusReport};
pub use ids::SubscriberId;
