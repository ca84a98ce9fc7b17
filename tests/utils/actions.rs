use hexpop::{
    board::Move,
    event::SessionEvent,
    game::{SessionId, SessionOperation, SessionStatus},
    matchmaking::MatchStatus,
    AppError,
};

use super::setup::TestSetup;

// ============================================================================
// Player Actions
// ============================================================================

#[allow(dead_code)]
impl TestSetup {
    /// Queues `first` then `second` and returns the session they land in
    pub async fn match_players(&self, first: &str, second: &str) -> SessionId {
        let waiting = self.state.matchmaking.join(first).await.unwrap();
        assert_eq!(waiting, MatchStatus::Waiting { requeued: false });

        match self.state.matchmaking.join(second).await.unwrap() {
            MatchStatus::Matched { session_id, .. } => session_id,
            other => panic!("expected a match, got {:?}", other),
        }
    }

    pub async fn connect(&self, session_id: &str, player_id: &str) -> Vec<SessionEvent> {
        self.state
            .registry
            .apply(
                session_id,
                SessionOperation::Connect {
                    player_id: player_id.to_string(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn disconnect(&self, session_id: &str, player_id: &str) -> Vec<SessionEvent> {
        self.state
            .registry
            .apply(
                session_id,
                SessionOperation::Disconnect {
                    player_id: player_id.to_string(),
                },
            )
            .await
            .unwrap()
    }

    /// Matches alice with bob and connects them both
    pub async fn start_game(&self) -> SessionId {
        let session_id = self.match_players("alice", "bob").await;
        self.connect(&session_id, "alice").await;
        self.connect(&session_id, "bob").await;
        session_id
    }

    pub async fn submit(
        &self,
        session_id: &str,
        player_id: &str,
        mv: Move,
    ) -> Result<Vec<SessionEvent>, AppError> {
        self.state
            .registry
            .apply(
                session_id,
                SessionOperation::SubmitMove {
                    player_id: player_id.to_string(),
                    mv,
                },
            )
            .await
    }

    /// A legal move for whoever is active right now
    pub async fn playable_move(&self, session_id: &str) -> (String, Move) {
        let snapshot = self.state.registry.get(session_id).await.unwrap();
        let active = snapshot.active_player.expect("no active player");
        let (_, cells) = snapshot.board.groups(3).remove(0);
        (active, Move::pop(cells[0].x, cells[0].y))
    }

    pub async fn play_any_move(&self, session_id: &str) -> Vec<SessionEvent> {
        let (active, mv) = self.playable_move(session_id).await;
        self.submit(session_id, &active, mv).await.unwrap()
    }

    /// Plays until the session stops being in progress, returns the move count
    pub async fn play_to_completion(&self, session_id: &str) -> usize {
        let mut moves = 0;
        loop {
            let snapshot = self.state.registry.get(session_id).await.unwrap();
            if snapshot.status != SessionStatus::InProgress {
                return moves;
            }
            self.play_any_move(session_id).await;
            moves += 1;
        }
    }
}
