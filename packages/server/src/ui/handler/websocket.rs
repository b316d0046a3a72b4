//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, Coordinate, OrderId},
    infrastructure::dto::websocket::ClientMessage,
};

use super::super::state::AppState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // Every transport session gets a fresh identity; a reconnecting client
    // carries nothing over from its previous connection.
    let connection_id = ConnectionId::generate();
    ws.on_upgrade(move |socket| handle_socket(socket, state, connection_id))
}

/// Spawns a task that receives messages from the rx channel and pushes them
/// to the WebSocket sender.
///
/// This is the outbound half of a connection: replays and broadcasts queued
/// by the relay task are drained here and written to the socket.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, connection_id: ConnectionId) {
    let (sender, mut receiver) = socket.split();

    // Create a channel for this connection and register it for delivery
    let (tx, rx) = mpsc::unbounded_channel();
    state.pusher.register_client(connection_id, tx).await;
    tracing::info!("Connection '{}' established", connection_id);

    let mut send_task = pusher_loop(rx, sender);

    let state_for_recv = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_client_message(&state_for_recv, connection_id, &text);
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping from '{}'", connection_id);
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Teardown: prune every room membership. The location cache is
    // deliberately left untouched so late viewers still get the last
    // reported position.
    state.pusher.unregister_client(connection_id).await;
    state.relay.leave_all(connection_id);
    tracing::info!("Connection '{}' closed", connection_id);
}

/// Route one inbound frame to the relay.
///
/// The protocol is fire-and-forget: malformed frames and invalid values are
/// logged and dropped, nothing is reported back to the sender.
fn handle_client_message(state: &AppState, connection_id: ConnectionId, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Dropping unparseable frame from '{}': {}", connection_id, e);
            return;
        }
    };

    match message {
        ClientMessage::JoinRoom { order_id } => match OrderId::new(order_id) {
            Ok(order_id) => state.relay.join(connection_id, order_id),
            Err(e) => {
                tracing::warn!("Dropping join from '{}': {}", connection_id, e);
            }
        },
        ClientMessage::LocationUpdate {
            order_id,
            lat,
            lng,
        } => {
            let order_id = match OrderId::new(order_id) {
                Ok(order_id) => order_id,
                Err(e) => {
                    tracing::warn!("Dropping update from '{}': {}", connection_id, e);
                    return;
                }
            };
            let coordinate = match Coordinate::new(lat, lng) {
                Ok(coordinate) => coordinate,
                Err(e) => {
                    tracing::warn!("Dropping update from '{}': {}", connection_id, e);
                    return;
                }
            };
            state.relay.update(connection_id, order_id, coordinate);
        }
    }
}
