// Library crate for the hexpop game server
// This file exposes the public API for integration tests

pub mod board;
pub mod config;
pub mod event;
pub mod game;
pub mod matchmaking;
pub mod rewards;
pub mod session;
pub mod shared;
pub mod user;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use board::{Board, Move};
pub use config::{GameConfig, ServerConfig};
pub use event::{Broadcaster, SessionEvent, Subscription};
pub use game::{Seat, SessionOperation, SessionSnapshot, SessionStatus};
pub use matchmaking::{MatchStatus, MatchmakingService};
pub use rewards::{GameResult, RewardCalculator, RewardDelta};
pub use session::SessionRegistry;
pub use shared::{AppError, AppState};
pub use websockets::{
    ConnectionId, ConnectionManager, InMemoryConnectionManager, MessageType, WebSocketMessage,
};
