//! Broadcast domain for the Obsentra sensor relay.
//!
//! A [`Relay`] owns the three pieces of shared state the relay has:
//!
//! - the current sensor selection ([`selection::SelectionCell`]),
//! - the set of live streaming subscribers
//!   ([`registry::SubscriberRegistry`]),
//! - the fan-out logic that serializes an event once and delivers it to
//!   every subscriber, pruning the ones that can no longer receive.
//!
//! Transports plug in through the [`Subscriber`] trait, so nothing in this
//! crate knows about HTTP or `WebSocket`. A [`Relay`] is an ordinary value:
//! wrap it in an [`Arc`](std::sync::Arc) and hand it to every ingress
//! adapter that needs it.

pub mod config;
pub mod registry;
pub mod relay;
pub mod selection;
pub mod subscriber;

pub use config::{ConfigError, LogFormat, RelayConfig};
pub use registry::SubscriberRegistry;
pub use relay::Relay;
pub use selection::SelectionCell;
pub use subscriber::{ChannelSubscriber, DeliveryError, Subscriber};
