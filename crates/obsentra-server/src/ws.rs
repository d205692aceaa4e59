//! `WebSocket` acceptor for streaming subscribers.
//!
//! Each connection becomes a [`ChannelSubscriber`] registered with the
//! relay. The socket is split: a writer task drains the subscriber's queue
//! into the sink, and the read loop feeds text frames back into the relay
//! as inbound messages. Whichever side ends first tears the connection
//! down.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use obsentra_core::{ChannelSubscriber, Relay, Subscriber};
use obsentra_types::SubscriberId;
use tracing::{debug, instrument, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` subscriber connection.
///
/// # Route
///
/// `GET /` and `GET /ws`
pub async fn ws_subscribe(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let relay = Arc::clone(&state.relay);
    let capacity = state.subscriber_queue_capacity;
    ws.on_upgrade(move |socket| run_session(socket, relay, capacity))
}

/// Drive one subscriber from accept to teardown.
#[instrument(skip_all)]
async fn run_session(socket: WebSocket, relay: Arc<Relay>, capacity: usize) {
    let (mut sink, mut stream) = socket.split();
    let (subscriber, mut outbound) = ChannelSubscriber::new(capacity);
    let subscriber = Arc::new(subscriber);
    let id = subscriber.id();

    // Queues the selection greeting ahead of any broadcast.
    relay.accept(Arc::clone(&subscriber) as Arc<dyn Subscriber>);

    let writer_handle = Arc::clone(&subscriber);
    let mut writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                payload = outbound.recv() => {
                    let Some(payload) = payload else { break };
                    // Shares the fan-out buffer; only the UTF-8 check runs per subscriber.
                    let text = match Utf8Bytes::try_from(payload) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(subscriber_id = %writer_handle.id(), error = %e, "dropping non-UTF-8 payload");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        debug!(subscriber_id = %writer_handle.id(), "send failed, closing");
                        break;
                    }
                }
                () = writer_handle.closed() => break,
            }
        }
        writer_handle.close();
        let _ = sink.close().await;
    });

    tokio::select! {
        () = read_frames(&relay, id, &mut stream) => {
            relay.disconnect(id);
            let _ = writer.await;
        }
        _ = &mut writer => {
            relay.disconnect(id);
        }
    }

    debug!(subscriber_id = %id, "session ended");
}

/// Feed inbound frames to the relay until the peer closes or errors.
async fn read_frames(relay: &Relay, id: SubscriberId, stream: &mut SplitStream<WebSocket>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                debug!(subscriber_id = %id, message = %text.as_str(), "message from subscriber");
                relay.handle_inbound(id, text.as_str());
            }
            Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                Ok(text) => relay.handle_inbound(id, text),
                Err(_) => {
                    debug!(subscriber_id = %id, len = data.len(), "ignoring non-UTF-8 binary frame");
                }
            },
            Ok(Message::Close(_)) => {
                debug!(subscriber_id = %id, "subscriber sent close frame");
                return;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                debug!(subscriber_id = %id, error = %e, "WebSocket error");
                return;
            }
        }
    }
}
