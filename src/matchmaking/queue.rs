use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;

use crate::user::PlayerProfile;

/// A player waiting for an opponent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRequest {
    pub player: PlayerProfile,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Added to the back of the queue
    Enqueued,
    /// Already waiting; the entry was refreshed in place
    Requeued,
    /// Paired with the longest-waiting player, who is no longer queued
    Paired(MatchRequest),
}

/// FIFO waiting set. Every decision happens under one lock, so a waiting
/// player is handed out at most once.
pub struct MatchmakingQueue {
    waiting: Mutex<VecDeque<MatchRequest>>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self {
            waiting: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn join(&self, player: PlayerProfile) -> JoinOutcome {
        let mut waiting = self.waiting.lock().await;

        if let Some(existing) = waiting
            .iter_mut()
            .find(|request| request.player.player_id == player.player_id)
        {
            existing.player = player;
            return JoinOutcome::Requeued;
        }

        if let Some(opponent) = waiting.pop_front() {
            debug!(
                player = %player.player_id,
                opponent = %opponent.player.player_id,
                "Paired waiting players"
            );
            return JoinOutcome::Paired(opponent);
        }

        debug!(player = %player.player_id, "Player queued");
        waiting.push_back(MatchRequest {
            player,
            joined_at: Utc::now(),
        });
        JoinOutcome::Enqueued
    }

    /// Puts a request handed out by `join` back at the front, keeping its
    /// place in line. No-op if the player queued again in the meantime.
    pub async fn restore(&self, request: MatchRequest) -> bool {
        let mut waiting = self.waiting.lock().await;
        if waiting
            .iter()
            .any(|queued| queued.player.player_id == request.player.player_id)
        {
            return false;
        }
        debug!(player = %request.player.player_id, "Pairing undone, request restored");
        waiting.push_front(request);
        true
    }

    /// Removes the player's request. Returns false if there was none.
    pub async fn cancel(&self, player_id: &str) -> bool {
        let mut waiting = self.waiting.lock().await;
        let before = waiting.len();
        waiting.retain(|request| request.player.player_id != player_id);
        waiting.len() < before
    }

    pub async fn len(&self) -> usize {
        self.waiting.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_waiting(&self, player_id: &str) -> bool {
        self.waiting
            .lock()
            .await
            .iter()
            .any(|request| request.player.player_id == player_id)
    }
}

impl Default for MatchmakingQueue {
    fn default() -> Self {
        Self::new()
    }
}
