use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tickerhub_clock::Clock;
use tracing::{debug, warn};

use crate::infrastructure::HubHandle;
use crate::presentation::rest::AppState;

/// Handle WebSocket upgrade
pub async fn ws_handler<C: Clock + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<C>>>,
) -> Response {
    let hub = state.hub.clone();
    let write_timeout = state.write_timeout;
    ws.on_upgrade(move |socket| handle_socket(socket, hub, write_timeout))
}

/// Push every published snapshot to one client until either side goes away
///
/// Writes happen here, never in the hub. Each write is bounded by
/// `write_timeout`; a failed or slow write ends the connection. Inbound
/// frames are only read to notice the client closing.
async fn handle_socket(socket: WebSocket, hub: HubHandle, write_timeout: Duration) {
    let mut subscription = match hub.subscribe() {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(error = %e, "Rejecting WebSocket client");
            return;
        }
    };
    let id = subscription.id();
    debug!(subscriber = id, "WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = subscription.recv().await {
            let write = sender.send(Message::Text(payload));
            match tokio::time::timeout(write_timeout, write).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(subscriber = id, error = %e, "WebSocket write failed");
                    break;
                }
                Err(_) => {
                    warn!(subscriber = id, "WebSocket write timed out");
                    break;
                }
            }
        }

        // Release the hub slot first; a stalled peer can block the close
        drop(subscription);
        let _ = tokio::time::timeout(write_timeout, sender.close()).await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unsubscribe(id);
    debug!(subscriber = id, "WebSocket client disconnected");
}
