use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use hexpop::event::{PlayerNotifier, SessionEvent};
use hexpop::websockets::{ConnectionId, ConnectionManager, MessageType, WebSocketMessage};
use uuid::Uuid;

// ============================================================================
// Mock Infrastructure
// ============================================================================

#[derive(Clone)]
pub struct MockConnectionManager {
    sent_messages: Arc<RwLock<HashMap<String, Vec<String>>>>,
    connected_players: Arc<RwLock<Vec<(String, ConnectionId)>>>,
}

#[allow(dead_code)]
impl MockConnectionManager {
    pub fn new() -> Self {
        Self {
            sent_messages: Arc::new(RwLock::new(HashMap::new())),
            connected_players: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Newest connection wins, like a real reconnect
    pub async fn add_connected_player(&self, player_id: &str) -> ConnectionId {
        let connection_id = Uuid::new_v4();
        let mut players = self.connected_players.write().await;
        players.retain(|(p, _)| p != player_id);
        players.push((player_id.to_string(), connection_id));
        connection_id
    }

    pub async fn get_messages_for(&self, player_id: &str) -> Vec<String> {
        self.sent_messages
            .read()
            .await
            .get(player_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Decoded messages of one type, oldest first
    pub async fn messages_of_type(
        &self,
        player_id: &str,
        message_type: MessageType,
    ) -> Vec<WebSocketMessage> {
        self.get_messages_for(player_id)
            .await
            .iter()
            .map(|raw| serde_json::from_str::<WebSocketMessage>(raw).unwrap())
            .filter(|message| message.message_type == message_type)
            .collect()
    }

    pub async fn clear_messages(&self) {
        self.sent_messages.write().await.clear();
    }
}

#[async_trait]
impl ConnectionManager for MockConnectionManager {
    async fn add_connection(
        &self,
        player_id: String,
        _sender: mpsc::UnboundedSender<String>,
    ) -> ConnectionId {
        self.add_connected_player(&player_id).await
    }

    async fn remove_connection(&self, player_id: &str, connection_id: ConnectionId) -> bool {
        let mut players = self.connected_players.write().await;
        let before = players.len();
        players.retain(|(p, id)| !(p == player_id && *id == connection_id));
        players.len() < before
    }

    async fn send_to_player(&self, player_id: &str, message: &str) {
        self.sent_messages
            .write()
            .await
            .entry(player_id.to_string())
            .or_default()
            .push(message.to_string());
    }

    async fn is_connected(&self, player_id: &str) -> bool {
        self.connected_players
            .read()
            .await
            .iter()
            .any(|(p, _)| p == player_id)
    }
}

#[async_trait]
impl PlayerNotifier for MockConnectionManager {
    async fn notify_player(&self, player_id: &str, event: &SessionEvent) {
        let json = WebSocketMessage::from_event(event).to_json().unwrap();
        self.send_to_player(player_id, &json).await;
    }
}
