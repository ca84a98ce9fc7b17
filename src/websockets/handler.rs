use async_trait::async_trait;
use axum::{
    extract::{ws::WebSocket, Path, State, WebSocketUpgrade},
    response::Response,
    Json,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::event::{SessionEvent, SubscriberId};
use crate::game::{SessionId, SessionOperation, SessionSnapshot};
use crate::matchmaking::MatchStatus;
use crate::shared::{AppError, AppState};

use super::connection_manager::ConnectionId;
use super::messages::{MessageType, SubmitMovePayload, WatchSessionPayload, WebSocketMessage};
use super::socket::{Connection, MessageHandler};

struct Watch {
    subscriber_id: SubscriberId,
    forwarder: JoinHandle<()>,
}

/// Routes one player's inbound messages to matchmaking and the session registry
pub struct SessionMessageHandler {
    app_state: AppState,
    watches: Mutex<HashMap<SessionId, Watch>>,
}

impl SessionMessageHandler {
    pub fn new(app_state: AppState) -> Self {
        Self {
            app_state,
            watches: Mutex::new(HashMap::new()),
        }
    }

    async fn send(&self, player_id: &str, message: WebSocketMessage) {
        match message.to_json() {
            Ok(json) => {
                self.app_state
                    .connection_manager
                    .send_to_player(player_id, &json)
                    .await
            }
            Err(e) => warn!(player = %player_id, error = %e, "Failed to encode message"),
        }
    }

    async fn send_error(&self, player_id: &str, error: &AppError) {
        debug!(player = %player_id, error = %error, "Request rejected");
        self.send(player_id, WebSocketMessage::error(error.to_string()))
            .await;
    }

    async fn join_queue(&self, player_id: &str) {
        match self.app_state.matchmaking.join(player_id).await {
            Ok(MatchStatus::Waiting { requeued }) => {
                self.send(player_id, WebSocketMessage::queued(requeued))
                    .await
            }
            // MATCH_FOUND already went out through the notifier
            Ok(MatchStatus::Matched { .. }) => {}
            Err(e) => self.send_error(player_id, &e).await,
        }
    }

    async fn watch_session(&self, player_id: &str, session_id: &str) {
        let snapshot = match self.app_state.registry.get(session_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return self.send_error(player_id, &e).await,
        };

        if !self.subscribe(player_id, session_id).await {
            let error = AppError::NotFound(format!("Session {} has closed", session_id));
            return self.send_error(player_id, &error).await;
        }

        let seated = snapshot
            .players
            .iter()
            .any(|seat| seat.player.player_id == player_id);
        if !seated {
            return self.send_snapshot(player_id, snapshot).await;
        }

        let operation = SessionOperation::Connect {
            player_id: player_id.to_string(),
        };
        match self.app_state.registry.apply(session_id, operation).await {
            Ok(events) => {
                let updated = events
                    .iter()
                    .any(|event| matches!(event, SessionEvent::StateUpdated(_)));
                // An ended session emits nothing on connect
                if !updated {
                    if let Ok(snapshot) = self.app_state.registry.get(session_id).await {
                        self.send_snapshot(player_id, snapshot).await;
                    }
                }
            }
            Err(e) => self.send_error(player_id, &e).await,
        }
    }

    async fn send_snapshot(&self, player_id: &str, snapshot: SessionSnapshot) {
        let event = SessionEvent::StateUpdated(snapshot);
        self.send(player_id, WebSocketMessage::from_event(&event))
            .await;
    }

    /// Forwards the session's broadcast stream to this player's socket.
    /// False if the session's channel has already closed.
    async fn subscribe(&self, player_id: &str, session_id: &str) -> bool {
        let broadcaster = self.app_state.registry.broadcaster().clone();
        let Some(mut subscription) = broadcaster.subscribe_existing(session_id).await else {
            return false;
        };
        let subscriber_id = subscription.id.clone();

        let connections = self.app_state.connection_manager.clone();
        let target = player_id.to_string();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                match WebSocketMessage::from_event(&event).to_json() {
                    Ok(json) => connections.send_to_player(&target, &json).await,
                    Err(e) => warn!(player = %target, error = %e, "Failed to encode event"),
                }
            }
        });

        let previous = self.watches.lock().await.insert(
            session_id.to_string(),
            Watch {
                subscriber_id,
                forwarder,
            },
        );
        if let Some(previous) = previous {
            previous.forwarder.abort();
            broadcaster
                .unsubscribe(session_id, &previous.subscriber_id)
                .await;
        }
        true
    }

    async fn submit_move(&self, player_id: &str, body: SubmitMovePayload) {
        let operation = SessionOperation::SubmitMove {
            player_id: player_id.to_string(),
            mv: body.to_move(),
        };
        if let Err(e) = self
            .app_state
            .registry
            .apply(&body.session_id, operation)
            .await
        {
            self.send_error(player_id, &e).await;
        }
    }

    /// Drops subscriptions, withdraws any queue entry and tells the
    /// player's live session they left
    #[instrument(skip(self))]
    pub async fn shutdown(&self, player_id: &str) {
        self.release_watches().await;
        self.leave(player_id).await;
    }

    /// Teardown for one socket. Only the player's current socket takes
    /// them out of the queue and their session.
    #[instrument(skip(self))]
    pub async fn connection_closed(&self, player_id: &str, connection_id: ConnectionId) {
        self.release_watches().await;

        let current = self
            .app_state
            .connection_manager
            .remove_connection(player_id, connection_id)
            .await;
        if current {
            self.leave(player_id).await;
        } else {
            debug!(player = %player_id, "Replaced socket closed, player stays");
        }
    }

    async fn release_watches(&self) {
        let watches: Vec<(SessionId, Watch)> = self.watches.lock().await.drain().collect();
        for (session_id, watch) in watches {
            watch.forwarder.abort();
            self.app_state
                .registry
                .broadcaster()
                .unsubscribe(&session_id, &watch.subscriber_id)
                .await;
        }
    }

    async fn leave(&self, player_id: &str) {
        self.app_state.matchmaking.cancel(player_id).await;

        if let Some(session_id) = self.app_state.registry.active_session_for(player_id).await {
            let operation = SessionOperation::Disconnect {
                player_id: player_id.to_string(),
            };
            if let Err(e) = self.app_state.registry.apply(&session_id, operation).await {
                debug!(
                    player = %player_id,
                    session_id = %session_id,
                    error = %e,
                    "Disconnect not applied"
                );
            }
        }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(
    payload: serde_json::Value,
) -> Result<T, AppError> {
    serde_json::from_value(payload).map_err(|e| AppError::BadRequest(e.to_string()))
}

#[async_trait]
impl MessageHandler for SessionMessageHandler {
    async fn handle_message(&self, player_id: &str, message: String) {
        debug!(player = %player_id, message = %message, "Received message");

        let ws_message = match serde_json::from_str::<WebSocketMessage>(&message) {
            Ok(ws_message) => ws_message,
            Err(e) => {
                warn!(player = %player_id, error = %e, "Failed to parse WebSocket message");
                return self
                    .send_error(player_id, &AppError::BadRequest(e.to_string()))
                    .await;
            }
        };

        match ws_message.message_type {
            MessageType::JoinQueue => self.join_queue(player_id).await,
            MessageType::CancelQueue => {
                self.app_state.matchmaking.cancel(player_id).await;
            }
            MessageType::WatchSession => {
                match parse_payload::<WatchSessionPayload>(ws_message.payload) {
                    Ok(body) => self.watch_session(player_id, &body.session_id).await,
                    Err(e) => self.send_error(player_id, &e).await,
                }
            }
            MessageType::SubmitMove => match parse_payload::<SubmitMovePayload>(ws_message.payload)
            {
                Ok(body) => self.submit_move(player_id, body).await,
                Err(e) => self.send_error(player_id, &e).await,
            },
            other => {
                debug!(message_type = ?other, "Unhandled message type");
                let error = AppError::BadRequest(format!("Unexpected message type {:?}", other));
                self.send_error(player_id, &error).await;
            }
        }
    }
}

/// GET /ws/:player_id
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(player_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    info!(player = %player_id, "WebSocket connection requested");

    let profile = app_state.identity.resolve_identity(&player_id).await?;

    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, profile.player_id, app_state)))
}

/// GET /sessions/:session_id
pub async fn get_session(
    Path(session_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = app_state.registry.get(&session_id).await?;
    Ok(Json(snapshot))
}

async fn handle_websocket_connection(socket: WebSocket, player_id: String, app_state: AppState) {
    info!(player = %player_id, "WebSocket connection established");

    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
    let connection_id = app_state
        .connection_manager
        .add_connection(player_id.clone(), outbound_sender)
        .await;

    let handler = Arc::new(SessionMessageHandler::new(app_state.clone()));
    let connection = Connection::new(
        player_id.clone(),
        Box::new(socket),
        outbound_receiver,
        handler.clone(),
    );

    match connection.run().await {
        Ok(()) => info!(player = %player_id, "WebSocket connection closed cleanly"),
        Err(e) => warn!(player = %player_id, error = ?e, "WebSocket connection error"),
    }

    handler.connection_closed(&player_id, connection_id).await;
}
