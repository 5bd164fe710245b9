//! WebSocket chat relay.
//!
//! DESIGN
//! ======
//! Each socket registers an outbound `mpsc` sender with the
//! `ConnectionManager` under its client-chosen ID and enters a `select!`
//! loop over three sources:
//! - inbound text from the client: echoed to the sender and broadcast to all
//! - queued outbound text from the manager: forwarded to the socket
//! - the ping interval: keeps idle connections alive through proxies
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade (an optional `?token=` must be a valid access token)
//! 2. Register → relay loop
//! 3. Close → unregister → broadcast the disconnect notice

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tracing::{info, warn};
use uuid::Uuid;

use super::auth::auth_error;
use crate::services::auth as auth_svc;
use crate::state::AppState;

const OUTBOUND_QUEUE: usize = 256;

#[must_use]
pub fn echo_text(message: &str) -> String {
    format!("Echo: {message}")
}

#[must_use]
pub fn broadcast_text(client_id: &str, message: &str) -> String {
    format!("Broadcast: {client_id} says {message}")
}

#[must_use]
pub fn disconnect_text(client_id: &str) -> String {
    format!("Client {client_id} disconnected")
}

// =============================================================================
// UPGRADE
// =============================================================================

/// `GET /ws/chat/{client_id}`
pub async fn handle_ws(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = match params.get("token") {
        Some(token) => match auth_svc::resolve_access_token(&state.pool, &state.settings, token).await {
            Ok((user, _)) => Some(user.id),
            Err(e) => return auth_error(e).into_response(),
        },
        None => None,
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, client_id, user_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, client_id: String, user_id: Option<Uuid>) {
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    state.connections.connect(&client_id, tx.clone()).await;
    info!(%client_id, ?user_id, "ws: client connected");

    let period = state.settings.ws_ping_interval.max(Duration::from_secs(1));
    let mut ping = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => relay(&state, &client_id, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(text) = rx.recv() => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = ping.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    if state.connections.disconnect(&client_id, &tx).await {
        state.connections.broadcast(&disconnect_text(&client_id)).await;
    }
    info!(%client_id, "ws: client disconnected");
}

/// Echo to the sender, then broadcast to every connection.
async fn relay(state: &AppState, client_id: &str, text: &str) {
    let message = text.trim();
    if message.is_empty() {
        return;
    }
    if !state.connections.send_personal(client_id, &echo_text(message)).await {
        warn!(%client_id, "ws: echo dropped");
    }
    let reached = state.connections.broadcast(&broadcast_text(client_id, message)).await;
    tracing::debug!(%client_id, reached, "ws: message broadcast");
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
