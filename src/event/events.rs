use serde::{Deserialize, Serialize};

use crate::board::{ClearPass, Move};
use crate::game::{Seat, SessionSnapshot};
use crate::rewards::{GameResult, RewardDelta};
use crate::user::{PlayerId, PlayerProfile};

/// Facts about a session, published in the order they happened.
///
/// `MatchFound` goes to each matched player directly; everything else goes
/// through the session's broadcast channel.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    MatchFound(MatchFound),
    PresenceChanged(PresenceChanged),
    StateUpdated(SessionSnapshot),
    MoveApplied(MoveApplied),
    TurnSkipped(TurnSkipped),
    SessionEnded(SessionEnded),
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::MatchFound(event) => &event.session_id,
            SessionEvent::PresenceChanged(event) => &event.session_id,
            SessionEvent::StateUpdated(snapshot) => &snapshot.session_id,
            SessionEvent::MoveApplied(event) => &event.session_id,
            SessionEvent::TurnSkipped(event) => &event.session_id,
            SessionEvent::SessionEnded(event) => &event.result.session_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFound {
    pub session_id: String,
    pub seat: Seat,
    pub opponent: PlayerProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChanged {
    pub session_id: String,
    pub player_id: PlayerId,
    pub connected: bool,
}

/// An accepted move, with every clear pass in order for animation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveApplied {
    pub session_id: String,
    pub player_id: PlayerId,
    #[serde(rename = "move")]
    pub mv: Move,
    pub points: u32,
    pub passes: Vec<ClearPass>,
    pub bomb_earned: bool,
    pub board_regenerated: bool,
}

/// The turn clock ran out before the active player used their moves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSkipped {
    pub session_id: String,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEnded {
    pub result: GameResult,
    pub rewards: [RewardDelta; 2],
}
