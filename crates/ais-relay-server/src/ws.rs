//! `WebSocket` transport for relay clients.
//!
//! Each connection runs as a small actor: a writer task owns the socket sink
//! and drains the hub's outbound channel, while the reader loop feeds every
//! inbound text frame to [`BroadcastHub::handle_frame`]. The hub never
//! touches the socket directly.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::error::ProtocolError;
use crate::hub::{BroadcastHub, OutboundReceiver};
use crate::state::AppState;

/// Upgrade an HTTP request to a relay `WebSocket` session.
///
/// # Route
///
/// `GET /` and `GET /ws`
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let hub = Arc::clone(state.hub());
    ws.on_upgrade(move |socket| run_connection(socket, hub, peer))
}

/// Drive one client session until it closes.
async fn run_connection(socket: WebSocket, hub: Arc<BroadcastHub>, peer: SocketAddr) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (id, rx) = hub.connect().await;
    info!(connection_id = %id, %peer, "Client connected");

    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => hub.handle_frame(id, text.as_str()).await,
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => hub.handle_frame(id, text).await,
                Err(e) => {
                    let e = ProtocolError::from(e);
                    warn!(connection_id = %id, error = %e, "Error parsing message");
                }
            },
            // Pongs are queued by the transport itself.
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                debug!(connection_id = %id, reason = ?frame, "Client initiated close");
                break;
            }
            Some(Err(e)) => {
                warn!(connection_id = %id, error = %e, "WebSocket receive error");
                break;
            }
            None => break,
        }
    }

    writer_handle.abort();
    let role = hub.disconnect(id).await;
    info!(
        connection_id = %id,
        role = role.map_or("unknown", |r| r.as_str()),
        "Client disconnected"
    );
}

/// Forward queued frames to the socket until either side closes.
async fn writer_task(mut sink: SplitSink<WebSocket, Message>, mut rx: OutboundReceiver) {
    while let Some(payload) = rx.recv().await {
        if sink
            .send(Message::Text(payload.as_ref().into()))
            .await
            .is_err()
        {
            break;
        }
    }
    let _ = sink.close().await;
}
