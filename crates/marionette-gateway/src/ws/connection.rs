use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;
use crate::ws::handlers;

/// Axum handler — upgrades HTTP to WebSocket at GET /client-ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_connection(socket, state))
}

/// Per-renderer task — lives for the whole streaming session.
///
/// The socket splits into a reader loop (inbound command frames) and a
/// dedicated single writer task that drains the session's outbound channel,
/// preserving FIFO order all the way to the wire.
async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let (session, mut outbound_rx) = state.registry.connect();
    let session_id = session.id().clone();
    info!(session = %session_id, "renderer connected");

    let (mut sink, mut stream) = socket.split();

    let writer_session = session_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    warn!(session = %writer_session, error = %e, "frame serialization failed");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handlers::handle_frame(&session, &text).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // pings are answered by the protocol layer; binary is ignored
            Err(e) => {
                warn!(session = %session_id, error = %e, "stream read failed");
                break;
            }
        }
    }

    state.registry.disconnect(&session_id);
    // Dropping the receiver closes the channel; in-flight producers observe
    // closed-on-send and drop their frames.
    writer.abort();
    info!(session = %session_id, "renderer disconnected");
}
