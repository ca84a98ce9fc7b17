use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use super::messages::WebSocketMessage;
use crate::event::{PlayerNotifier, SessionEvent};

/// Identifies one socket. A player who reconnects gets a new one.
pub type ConnectionId = Uuid;

#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// Registers the player's newest socket, replacing any older one
    async fn add_connection(
        &self,
        player_id: String,
        sender: mpsc::UnboundedSender<String>,
    ) -> ConnectionId;

    /// Removes the player's connection only if it is still `connection_id`.
    /// Returns whether anything was removed.
    async fn remove_connection(&self, player_id: &str, connection_id: ConnectionId) -> bool;

    async fn send_to_player(&self, player_id: &str, message: &str);

    async fn is_connected(&self, player_id: &str) -> bool;
}

pub struct InMemoryConnectionManager {
    // player_id -> (connection, sender)
    connections: Arc<RwLock<HashMap<String, (ConnectionId, mpsc::UnboundedSender<String>)>>>,
}

impl InMemoryConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn add_connection(
        &self,
        player_id: String,
        sender: mpsc::UnboundedSender<String>,
    ) -> ConnectionId {
        let connection_id = Uuid::new_v4();
        let mut connections = self.connections.write().await;
        if connections
            .insert(player_id.clone(), (connection_id, sender))
            .is_some()
        {
            debug!(player = %player_id, "Replaced existing connection");
        }
        connection_id
    }

    async fn remove_connection(&self, player_id: &str, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(player_id) {
            Some((current, _)) if *current == connection_id => {
                connections.remove(player_id);
                true
            }
            Some(_) => {
                debug!(player = %player_id, "Stale connection closed, newer one kept");
                false
            }
            None => false,
        }
    }

    async fn send_to_player(&self, player_id: &str, message: &str) {
        let connections = self.connections.read().await;
        if let Some((_, sender)) = connections.get(player_id) {
            let _ = sender.send(message.to_string());
        }
    }

    async fn is_connected(&self, player_id: &str) -> bool {
        self.connections.read().await.contains_key(player_id)
    }
}

#[async_trait]
impl PlayerNotifier for InMemoryConnectionManager {
    async fn notify_player(&self, player_id: &str, event: &SessionEvent) {
        match WebSocketMessage::from_event(event).to_json() {
            Ok(json) => self.send_to_player(player_id, &json).await,
            Err(e) => warn!(player = %player_id, error = %e, "Failed to encode event"),
        }
    }
}
