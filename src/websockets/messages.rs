use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::{Move, MoveAction};
use crate::event::SessionEvent;

/// Message types for WebSocket communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // Client -> Server
    JoinQueue,
    CancelQueue,
    WatchSession,
    SubmitMove,

    // Server -> Client
    Queued,
    MatchFound,
    PresenceChanged,
    StateUpdated,
    MoveApplied,
    TurnSkipped,
    SessionEnded,
    Error,
}

/// Metadata for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessageMeta {
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
}

/// Base structure for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub meta: Option<WebSocketMessageMeta>,
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSessionPayload {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitMovePayload {
    pub session_id: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub action: MoveAction,
}

impl SubmitMovePayload {
    pub fn to_move(&self) -> Move {
        match self.action {
            MoveAction::Pop => Move::pop(self.x, self.y),
            MoveAction::Bomb => Move::bomb(self.x, self.y),
        }
    }
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedPayload {
    /// True when the player was already waiting
    pub requeued: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

fn payload<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_default()
}

/// Helper functions for creating messages
impl WebSocketMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WebSocketMessageMeta {
                timestamp: Utc::now(),
                session_id: None,
            }),
        }
    }

    /// Wire form of a session event
    pub fn from_event(event: &SessionEvent) -> Self {
        let (message_type, body) = match event {
            SessionEvent::MatchFound(found) => (MessageType::MatchFound, payload(found)),
            SessionEvent::PresenceChanged(presence) => {
                (MessageType::PresenceChanged, payload(presence))
            }
            SessionEvent::StateUpdated(snapshot) => (MessageType::StateUpdated, payload(snapshot)),
            SessionEvent::MoveApplied(applied) => (MessageType::MoveApplied, payload(applied)),
            SessionEvent::TurnSkipped(skipped) => (MessageType::TurnSkipped, payload(skipped)),
            SessionEvent::SessionEnded(ended) => (MessageType::SessionEnded, payload(ended)),
        };

        let mut message = Self::new(message_type, body);
        if let Some(meta) = message.meta.as_mut() {
            meta.session_id = Some(event.session_id().to_string());
        }
        message
    }

    /// Create a QUEUED message
    pub fn queued(requeued: bool) -> Self {
        Self::new(MessageType::Queued, payload(&QueuedPayload { requeued }))
    }

    /// Create an ERROR message
    pub fn error(message: impl Into<String>) -> Self {
        let body = ErrorPayload {
            message: message.into(),
        };
        Self::new(MessageType::Error, payload(&body))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{MatchFound, TurnSkipped};
    use crate::game::Seat;
    use crate::user::PlayerProfile;

    #[test]
    fn types_use_screaming_snake_case() {
        let message = WebSocketMessage::queued(true);
        let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "QUEUED");
        assert_eq!(json["payload"]["requeued"], true);
    }

    #[test]
    fn submit_move_defaults_to_pop() {
        let raw = r#"{"type":"SUBMIT_MOVE","payload":{"session_id":"s-1","x":2,"y":5}}"#;
        let message: WebSocketMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(message.message_type, MessageType::SubmitMove);

        let body: SubmitMovePayload = serde_json::from_value(message.payload).unwrap();
        assert_eq!(body.to_move(), Move::pop(2, 5));
    }

    #[test]
    fn bomb_action_is_parsed() {
        let raw = r#"{"session_id":"s-1","x":3,"y":3,"action":"bomb"}"#;
        let body: SubmitMovePayload = serde_json::from_str(raw).unwrap();
        assert_eq!(body.to_move(), Move::bomb(3, 3));
    }

    #[test]
    fn events_carry_their_session_id() {
        let event = SessionEvent::TurnSkipped(TurnSkipped {
            session_id: "s-9".into(),
            player_id: "alice".into(),
        });
        let message = WebSocketMessage::from_event(&event);
        assert_eq!(message.message_type, MessageType::TurnSkipped);
        assert_eq!(message.meta.unwrap().session_id.as_deref(), Some("s-9"));
        assert_eq!(message.payload["player_id"], "alice");
    }

    #[test]
    fn match_found_names_the_opponent() {
        let event = SessionEvent::MatchFound(MatchFound {
            session_id: "s-1".into(),
            seat: Seat::Two,
            opponent: PlayerProfile::new("bob", "Bob"),
        });
        let message = WebSocketMessage::from_event(&event);
        assert_eq!(message.message_type, MessageType::MatchFound);
        assert_eq!(message.payload["opponent"]["display_name"], "Bob");
        assert_eq!(message.payload["seat"], "two");
    }
}
