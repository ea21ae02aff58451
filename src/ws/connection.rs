//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single WebSocket connection:
//! inbound text frames are subscribe requests handed to the
//! dispatcher on spawned tasks, and the outbound queue filled by
//! subscription pumps is drained onto the socket. When the socket
//! closes, every subscription owned by the connection is torn down.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use crate::app_state::AppState;
use crate::catalog::ResourceQuery;
use crate::domain::ConnectionId;

/// Runs the read/write loop for a single WebSocket connection.
///
/// `session` carries the decoded query parameters of the upgrade
/// request; they form the base query every subscribe request's filter
/// is merged into.
pub async fn run_connection(socket: WebSocket, state: AppState, session: ResourceQuery) {
    let connection_id = ConnectionId::new();
    let mut outbound = state.transport.register(connection_id.clone());
    let (mut ws_tx, mut ws_rx) = socket.split();

    tracing::debug!(connection = %connection_id, "ws connection opened");

    loop {
        tokio::select! {
            // Incoming subscribe request from the client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        // Resolution, compilation and binding run off
                        // the inbound loop so a slow bind cannot stall
                        // other messages on this or other connections.
                        let dispatcher = Arc::clone(&state.dispatcher);
                        let connection = connection_id.clone();
                        let session = session.clone();
                        tokio::spawn(async move {
                            let result = dispatcher.handle_request(&connection, &text, &session);
                            if let Err(error) = result {
                                tracing::warn!(
                                    connection = %connection,
                                    %error,
                                    "subscribe request rejected"
                                );
                            }
                        });
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(error)) => {
                        tracing::debug!(connection = %connection_id, %error, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Serialized envelope from a subscription pump
            frame = outbound.recv() => {
                match frame {
                    Some(json) => {
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    state.transport.unregister(&connection_id);
    state.dispatcher.connection_closed(&connection_id);
    tracing::debug!(connection = %connection_id, "ws connection closed");
}
