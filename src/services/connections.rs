//! Live WebSocket connection registry.
//!
//! Each connected chat client registers an outbound `mpsc` sender under its
//! client-chosen ID. Sends are best-effort: a full or closed channel is
//! skipped, and closed channels are pruned on broadcast.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

#[derive(Clone, Default)]
pub struct ConnectionManager {
    clients: Arc<RwLock<HashMap<String, mpsc::Sender<String>>>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. A reconnect under the same ID replaces the old sender.
    pub async fn connect(&self, client_id: &str, tx: mpsc::Sender<String>) {
        let replaced = self
            .clients
            .write()
            .await
            .insert(client_id.to_owned(), tx)
            .is_some();
        tracing::info!(%client_id, replaced, "ws: client registered");
    }

    /// Remove a client if `tx` is still its registered sender. A connection
    /// that was replaced by a reconnect leaves the newer sender in place.
    /// Returns whether an entry was removed.
    pub async fn disconnect(&self, client_id: &str, tx: &mpsc::Sender<String>) -> bool {
        let mut clients = self.clients.write().await;
        if clients.get(client_id).is_some_and(|stored| stored.same_channel(tx)) {
            clients.remove(client_id);
            return true;
        }
        false
    }

    /// Send to a single client. Returns whether the message was queued.
    pub async fn send_personal(&self, client_id: &str, message: &str) -> bool {
        let clients = self.clients.read().await;
        clients
            .get(client_id)
            .is_some_and(|tx| tx.try_send(message.to_owned()).is_ok())
    }

    /// Send to every client. Returns the number of clients reached.
    pub async fn broadcast(&self, message: &str) -> usize {
        let mut closed = Vec::new();
        let mut delivered = 0;
        {
            let clients = self.clients.read().await;
            for (client_id, tx) in clients.iter() {
                match tx.try_send(message.to_owned()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push((client_id.clone(), tx.clone())),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(%client_id, "ws: outbound queue full, message dropped");
                    }
                }
            }
        }
        if !closed.is_empty() {
            let mut clients = self.clients.write().await;
            for (client_id, tx) in closed {
                if clients.get(&client_id).is_some_and(|stored| stored.same_channel(&tx)) {
                    clients.remove(&client_id);
                }
            }
        }
        delivered
    }

    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }
}

#[cfg(test)]
#[path = "connections_test.rs"]
mod tests;
