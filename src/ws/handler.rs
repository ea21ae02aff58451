//! Axum WebSocket upgrade handler.

use std::collections::HashMap;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::app_state::AppState;
use crate::catalog::ResourceQuery;

use super::connection::run_connection;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// The upgrade request's query parameters become the connection's
/// session query: a `$filter` carried there applies to every
/// subscribe request that does not override it.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let session = ResourceQuery::from_params(params);
    ws.on_upgrade(move |socket| run_connection(socket, state, session))
}
