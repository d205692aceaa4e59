//! Transport-agnostic subscriber handles.
//!
//! The mediator only needs three capabilities from a connection: ask
//! whether it is still open, push a serialized payload without blocking,
//! and close it. [`ChannelSubscriber`] provides them on top of a bounded
//! [`mpsc`] queue drained by a transport-specific writer task.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use obsentra_types::SubscriberId;
use tokio::sync::{Notify, mpsc};

/// Why a payload could not be handed to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The subscriber was closed or its transport went away.
    #[error("subscriber closed")]
    Closed,

    /// The subscriber's outbound queue is full.
    #[error("subscriber queue full")]
    Full,
}

/// A live streaming connection as seen by the relay.
///
/// Implementations must never block in [`send`](Subscriber::send).
pub trait Subscriber: Send + Sync {
    /// Stable identity used as the registry key.
    fn id(&self) -> SubscriberId;

    /// Whether the connection can still accept payloads.
    fn is_open(&self) -> bool;

    /// Queue a serialized payload for delivery.
    ///
    /// The payload is UTF-8 JSON shared by every recipient of one event.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the subscriber is closed or cannot take
    /// more data right now.
    fn send(&self, payload: Bytes) -> Result<(), DeliveryError>;

    /// Close the connection. Idempotent.
    fn close(&self);
}

/// Subscriber backed by a bounded channel.
///
/// The receiving half is returned from [`ChannelSubscriber::new`] and is
/// owned by whatever task writes frames to the real transport.
#[derive(Debug)]
pub struct ChannelSubscriber {
    id: SubscriberId,
    tx: mpsc::Sender<Bytes>,
    closed: AtomicBool,
    close_notify: Notify,
}

impl ChannelSubscriber {
    /// Create a subscriber with an outbound queue of `capacity` payloads.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let subscriber = Self {
            id: SubscriberId::new(),
            tx,
            closed: AtomicBool::new(false),
            close_notify: Notify::new(),
        };
        (subscriber, rx)
    }

    /// Resolves once [`close`](Subscriber::close) has been called.
    ///
    /// Meant for the single writer task that drains the queue.
    pub async fn closed(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.close_notify.notified().await;
    }
}

impl Subscriber for ChannelSubscriber {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    fn send(&self, payload: Bytes) -> Result<(), DeliveryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DeliveryError::Closed);
        }
        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            // notify_one stores a permit, so a writer that has not yet
            // started waiting still observes the close.
            self.close_notify.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn send_message_success() {
        let (sub, mut rx) = ChannelSubscriber::new(4);
        assert!(sub.send(Bytes::from_static(b"hello")).is_ok());
        let msg = rx.recv().await.unwrap();
        assert_eq!(&msg[..], b"hello");
    }

    #[test]
    fn send_to_dropped_receiver_is_closed() {
        let (sub, rx) = ChannelSubscriber::new(4);
        drop(rx);
        assert!(!sub.is_open());
        assert_eq!(sub.send(Bytes::from_static(b"x")), Err(DeliveryError::Closed));
    }

    #[test]
    fn send_to_full_queue_is_rejected() {
        let (sub, _rx) = ChannelSubscriber::new(1);
        assert!(sub.send(Bytes::from_static(b"first")).is_ok());
        assert_eq!(sub.send(Bytes::from_static(b"second")), Err(DeliveryError::Full));
        assert!(sub.is_open());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (sub, _rx) = ChannelSubscriber::new(0);
        assert!(sub.send(Bytes::from_static(b"only")).is_ok());
    }

    #[test]
    fn close_is_idempotent_and_blocks_sends() {
        let (sub, _rx) = ChannelSubscriber::new(4);
        sub.close();
        sub.close();
        assert!(!sub.is_open());
        assert_eq!(sub.send(Bytes::from_static(b"late")), Err(DeliveryError::Closed));
    }

    #[tokio::test]
    async fn closed_resolves_after_close() {
        let (sub, _rx) = ChannelSubscriber::new(4);
        let sub = Arc::new(sub);
        let waiter = {
            let sub = Arc::clone(&sub);
            tokio::spawn(async move { sub.closed().await })
        };
        sub.close();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn closed_resolves_when_already_closed() {
        let (sub, _rx) = ChannelSubscriber::new(4);
        sub.close();
        tokio::time::timeout(Duration::from_secs(1), sub.closed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn payloads_arrive_in_order() {
        let (sub, mut rx) = ChannelSubscriber::new(8);
        for i in 0..5 {
            sub.send(Bytes::from(format!("msg_{i}"))).unwrap();
        }
        for i in 0..5 {
            assert_eq!(rx.recv().await.unwrap(), format!("msg_{i}"));
        }
    }
}
