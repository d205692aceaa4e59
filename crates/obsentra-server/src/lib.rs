//! HTTP and `WebSocket` ingress for the Obsentra sensor relay.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** used by sensor producers and dashboards to set and
//!   read the active sensor selection, report readings, and query status
//! - **`WebSocket` endpoint** (`/` and `/ws`) where subscribers receive the
//!   current selection on connect, then every broadcast event, and may push
//!   selection updates of their own
//!
//! # Architecture
//!
//! All shared state lives in an [`obsentra_core::Relay`] held by
//! [`AppState`]. Handlers translate requests into relay calls; the relay
//! does the fan-out. Each `WebSocket` connection is registered as a
//! [`ChannelSubscriber`](obsentra_core::ChannelSubscriber) whose queue is
//! drained by a per-connection writer task.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerError, serve, start_server};
pub use state::AppState;
