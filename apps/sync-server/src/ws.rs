//! Push channel: a one-way event stream. Clients connect, the server fans
//! every stored snapshot out; clients never speak on this socket beyond
//! keepalive frames.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info};

use crate::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("Push subscriber connected");

    let mut events = state.events.subscribe();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Forward broadcasts to this subscriber
    let tx_events = tx.clone();
    let broadcast_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        if tx_events.send(Message::Text(json)).is_err() {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // A later snapshot supersedes everything missed.
                    debug!("Subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Drain the outbound queue into the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Keepalive and close handling; inbound payloads are ignored
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                debug!("Push subscriber closed the channel");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Push channel error: {}", e);
                break;
            }
        }
    }

    broadcast_task.abort();
    send_task.abort();
    info!("Push subscriber disconnected");
}
