use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::Seat;
use crate::user::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub player_id: PlayerId,
    pub seat: Seat,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Every round was played
    Completed,
    /// A participant stayed away past the disconnect timeout
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Decided { winner: PlayerId, loser: PlayerId },
    Draw,
}

/// Final record of a session. Built once when the session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub session_id: String,
    pub players: [PlayerResult; 2],
    pub outcome: Outcome,
    pub reason: EndReason,
    /// Seat that forfeited by abandoning, if any
    pub forfeited_by: Option<PlayerId>,
    pub rounds_played: u32,
    pub ended_at: DateTime<Utc>,
}

impl GameResult {
    pub fn player(&self, player_id: &str) -> Option<&PlayerResult> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn opponent(&self, player_id: &str) -> Option<&PlayerResult> {
        self.players.iter().find(|p| p.player_id != player_id)
    }

    pub fn winner(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Decided { winner, .. } => Some(winner),
            Outcome::Draw => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.outcome == Outcome::Draw
    }
}

/// Per-player change for the external ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDelta {
    pub player_id: PlayerId,
    pub trophies: i32,
    pub coins: u32,
    pub stars: u8,
}

impl RewardDelta {
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            ..Self::default()
        }
    }
}
