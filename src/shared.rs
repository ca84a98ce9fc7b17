use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::board::IllegalMove;
use crate::config::GameConfig;
use crate::event::{Broadcaster, PlayerNotifier};
use crate::game::TurnError;
use crate::matchmaking::MatchmakingService;
use crate::rewards::{PersistenceError, ResultSink, RewardCalculator};
use crate::session::SessionRegistry;
use crate::user::IdentityLookup;
use crate::websockets::{ConnectionManager, InMemoryConnectionManager};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GameConfig>,
    pub identity: Arc<dyn IdentityLookup>,
    pub registry: SessionRegistry,
    pub matchmaking: Arc<MatchmakingService>,
    pub connection_manager: Arc<dyn ConnectionManager>,
}

impl AppState {
    pub fn new(
        config: GameConfig,
        identity: Arc<dyn IdentityLookup>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self::with_connections(
            config,
            identity,
            sink,
            Arc::new(InMemoryConnectionManager::new()),
        )
    }

    /// Wires the services around a connection manager that also delivers
    /// direct player notifications
    pub fn with_connections<C>(
        config: GameConfig,
        identity: Arc<dyn IdentityLookup>,
        sink: Arc<dyn ResultSink>,
        connections: Arc<C>,
    ) -> Self
    where
        C: ConnectionManager + PlayerNotifier + 'static,
    {
        let config = Arc::new(config);
        let broadcaster = Broadcaster::new(config.broadcast.subscriber_buffer);
        let rewards = Arc::new(RewardCalculator::new(&config.rewards));
        let registry = SessionRegistry::new(config.clone(), broadcaster, rewards, sink);

        let notifier: Arc<dyn PlayerNotifier> = connections.clone();
        let matchmaking = Arc::new(MatchmakingService::new(
            identity.clone(),
            registry.clone(),
            notifier,
        ));

        Self {
            config,
            identity,
            registry,
            matchmaking,
            connection_manager: connections,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not your turn")]
    WrongTurn,

    #[error("Illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),

    #[error("Already seated in a session: {0}")]
    AlreadySeated(String),

    #[error("Session not active: {0}")]
    SessionNotActive(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl From<TurnError> for AppError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::NotInProgress => AppError::SessionNotActive(err.to_string()),
            TurnError::WrongTurn => AppError::WrongTurn,
        }
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::WrongTurn | AppError::SessionNotActive(_) | AppError::AlreadySeated(_) => {
                StatusCode::CONFLICT
            }
            AppError::IllegalMove(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
