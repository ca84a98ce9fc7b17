use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::turn::{Seat, SessionStatus, TurnAdvance, TurnState};
use crate::board::{apply_move, Board, CellSource, IllegalMove, Move, MoveAction, MoveOutcome};
use crate::config::{GameConfig, RulesConfig, ScoringConfig};
use crate::event::{MoveApplied, PresenceChanged, SessionEvent, TurnSkipped};
use crate::rewards::{EndReason, GameResult, Outcome, PlayerResult, RewardDelta};
use crate::shared::AppError;
use crate::user::{PlayerId, PlayerProfile};

pub type SessionId = String;

/// Every way a session can change. Only the registry calls [`GameSession::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOperation {
    Connect { player_id: PlayerId },
    Disconnect { player_id: PlayerId },
    SubmitMove { player_id: PlayerId, mv: Move },
    /// Turn clock fired for the turn numbered `turn_seq`
    ExpireTurn { turn_seq: u64 },
    /// Disconnect clock fired for the absence numbered `epoch`
    ExpireDisconnect { player_id: PlayerId, epoch: u64 },
}

/// Clocks the registry must start after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerRequest {
    Turn { turn_seq: u64 },
    Disconnect { player_id: PlayerId, epoch: u64 },
}

#[derive(Debug, Default)]
pub struct Transition {
    pub events: Vec<SessionEvent>,
    pub timers: Vec<TimerRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSnapshot {
    pub seat: Seat,
    pub player: PlayerProfile,
    pub score: u32,
    pub bombs: u32,
    pub connected: bool,
}

/// Read-only view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub round: u32,
    pub total_rounds: u32,
    pub active_player: Option<PlayerId>,
    pub moves_remaining: u32,
    pub turn_seq: u64,
    pub players: Vec<SeatSnapshot>,
    pub board: Board,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewards: Option<[RewardDelta; 2]>,
}

impl SessionSnapshot {
    pub fn score_of(&self, player_id: &str) -> Option<u32> {
        self.players
            .iter()
            .find(|seat| seat.player.player_id == player_id)
            .map(|seat| seat.score)
    }
}

struct SeatState {
    profile: PlayerProfile,
    connected: bool,
    /// Bumped on every disconnect so stale clocks can be told apart
    epoch: u64,
    bombs: u32,
}

/// One two-player game: the board, the turn state and seat presence
pub struct GameSession {
    id: SessionId,
    seats: [SeatState; 2],
    board: Board,
    turn: TurnState,
    source: Box<dyn CellSource>,
    scoring: ScoringConfig,
    rules: RulesConfig,
    forfeited_by: Option<Seat>,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl GameSession {
    pub fn new(
        id: SessionId,
        one: PlayerProfile,
        two: PlayerProfile,
        board: Board,
        source: Box<dyn CellSource>,
        config: &GameConfig,
    ) -> Self {
        let seat = |profile| SeatState {
            profile,
            connected: false,
            epoch: 0,
            bombs: 0,
        };

        Self {
            id,
            seats: [seat(one), seat(two)],
            board,
            turn: TurnState::new(&config.rules),
            source,
            scoring: config.scoring.clone(),
            rules: config.rules.clone(),
            forfeited_by: None,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.turn.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn player(&self, seat: Seat) -> &PlayerProfile {
        &self.seats[seat.index()].profile
    }

    pub fn seat_of(&self, player_id: &str) -> Option<Seat> {
        Seat::ALL
            .into_iter()
            .find(|seat| self.seats[seat.index()].profile.player_id == player_id)
    }

    pub fn bombs(&self, seat: Seat) -> u32 {
        self.seats[seat.index()].bombs
    }

    pub fn apply(&mut self, operation: SessionOperation) -> Result<Transition, AppError> {
        match operation {
            SessionOperation::Connect { player_id } => self.connect(&player_id),
            SessionOperation::Disconnect { player_id } => self.disconnect(&player_id),
            SessionOperation::SubmitMove { player_id, mv } => self.submit_move(&player_id, mv),
            SessionOperation::ExpireTurn { turn_seq } => self.expire_turn(turn_seq),
            SessionOperation::ExpireDisconnect { player_id, epoch } => {
                self.expire_disconnect(&player_id, epoch)
            }
        }
    }

    fn seat_for(&self, player_id: &str) -> Result<Seat, AppError> {
        self.seat_of(player_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Player {} is not part of session {}",
                player_id, self.id
            ))
        })
    }

    fn connect(&mut self, player_id: &str) -> Result<Transition, AppError> {
        let seat = self.seat_for(player_id)?;
        let mut transition = Transition::default();
        if self.is_terminal() {
            return Ok(transition);
        }

        if !self.seats[seat.index()].connected {
            self.seats[seat.index()].connected = true;
            transition.events.push(self.presence_event(seat, true));
        }

        if self.seats.iter().all(|s| s.connected) && self.turn.start() {
            info!(session_id = %self.id, "Both players connected, session started");
            transition.timers.push(TimerRequest::Turn {
                turn_seq: self.turn.turn_seq(),
            });
        }

        transition
            .events
            .push(SessionEvent::StateUpdated(self.snapshot()));
        Ok(transition)
    }

    fn disconnect(&mut self, player_id: &str) -> Result<Transition, AppError> {
        let seat = self.seat_for(player_id)?;
        let mut transition = Transition::default();
        if self.is_terminal() || !self.seats[seat.index()].connected {
            return Ok(transition);
        }

        let state = &mut self.seats[seat.index()];
        state.connected = false;
        state.epoch += 1;
        let epoch = state.epoch;

        debug!(session_id = %self.id, player = %player_id, epoch, "Player disconnected");
        transition.events.push(self.presence_event(seat, false));
        transition.timers.push(TimerRequest::Disconnect {
            player_id: player_id.to_string(),
            epoch,
        });
        Ok(transition)
    }

    fn submit_move(&mut self, player_id: &str, mv: Move) -> Result<Transition, AppError> {
        let seat = self.seat_for(player_id)?;
        self.turn.check_move(seat)?;

        if mv.action == MoveAction::Bomb && self.seats[seat.index()].bombs == 0 {
            return Err(IllegalMove::NoBombs.into());
        }

        let MoveOutcome {
            board,
            passes,
            points,
            initial_size,
            board_regenerated,
        } = apply_move(&self.board, &mv, &self.scoring, self.source.as_mut())?;
        let advance = self.turn.record_move(seat, points)?;
        self.board = board;

        let state = &mut self.seats[seat.index()];
        let bomb_earned = match mv.action {
            MoveAction::Bomb => {
                state.bombs -= 1;
                false
            }
            MoveAction::Pop if initial_size >= self.rules.bomb_award_group_size => {
                state.bombs += 1;
                true
            }
            MoveAction::Pop => false,
        };

        debug!(
            session_id = %self.id,
            player = %player_id,
            points,
            cascades = passes.len().saturating_sub(1),
            "Move applied"
        );

        let mut transition = Transition::default();
        transition.events.push(SessionEvent::MoveApplied(MoveApplied {
            session_id: self.id.clone(),
            player_id: player_id.to_string(),
            mv,
            points,
            passes,
            bomb_earned,
            board_regenerated,
        }));
        self.after_advance(advance, &mut transition);
        Ok(transition)
    }

    fn expire_turn(&mut self, turn_seq: u64) -> Result<Transition, AppError> {
        let mut transition = Transition::default();
        let Some(seat) = self.turn.active() else {
            return Ok(transition);
        };
        if self.turn.turn_seq() != turn_seq {
            debug!(session_id = %self.id, turn_seq, "Ignoring stale turn timer");
            return Ok(transition);
        }

        let advance = self.turn.forfeit_turn()?;
        info!(
            session_id = %self.id,
            player = %self.player(seat).player_id,
            "Turn timed out"
        );
        transition.events.push(SessionEvent::TurnSkipped(TurnSkipped {
            session_id: self.id.clone(),
            player_id: self.player(seat).player_id.clone(),
        }));
        self.after_advance(advance, &mut transition);
        Ok(transition)
    }

    fn expire_disconnect(&mut self, player_id: &str, epoch: u64) -> Result<Transition, AppError> {
        let seat = self.seat_for(player_id)?;
        let mut transition = Transition::default();
        let state = &self.seats[seat.index()];
        if self.is_terminal() || state.connected || state.epoch != epoch {
            return Ok(transition);
        }

        self.forfeited_by = self.seats[seat.other().index()]
            .connected
            .then_some(seat);
        self.turn.abandon();
        self.ended_at = Some(Utc::now());

        warn!(
            session_id = %self.id,
            player = %player_id,
            forfeit = self.forfeited_by.is_some(),
            "Session abandoned"
        );
        transition
            .events
            .push(SessionEvent::StateUpdated(self.snapshot()));
        Ok(transition)
    }

    fn after_advance(&mut self, advance: TurnAdvance, transition: &mut Transition) {
        match advance {
            TurnAdvance::Continues => {}
            TurnAdvance::Passed(_) => transition.timers.push(TimerRequest::Turn {
                turn_seq: self.turn.turn_seq(),
            }),
            TurnAdvance::Completed => {
                self.ended_at = Some(Utc::now());
                info!(
                    session_id = %self.id,
                    score_one = self.turn.score(Seat::One),
                    score_two = self.turn.score(Seat::Two),
                    "Session completed"
                );
            }
        }
        transition
            .events
            .push(SessionEvent::StateUpdated(self.snapshot()));
    }

    fn presence_event(&self, seat: Seat, connected: bool) -> SessionEvent {
        SessionEvent::PresenceChanged(PresenceChanged {
            session_id: self.id.clone(),
            player_id: self.player(seat).player_id.clone(),
            connected,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            status: self.status(),
            round: self.turn.round(),
            total_rounds: self.turn.total_rounds(),
            active_player: self
                .turn
                .active()
                .map(|seat| self.player(seat).player_id.clone()),
            moves_remaining: self.turn.moves_remaining(),
            turn_seq: self.turn.turn_seq(),
            players: Seat::ALL
                .into_iter()
                .map(|seat| {
                    let state = &self.seats[seat.index()];
                    SeatSnapshot {
                        seat,
                        player: state.profile.clone(),
                        score: self.turn.score(seat),
                        bombs: state.bombs,
                        connected: state.connected,
                    }
                })
                .collect(),
            board: self.board.clone(),
            created_at: self.created_at,
            result: None,
            rewards: None,
        }
    }

    /// `None` until the session is terminal
    pub fn final_result(&self) -> Option<GameResult> {
        let reason = match self.status() {
            SessionStatus::Completed => EndReason::Completed,
            SessionStatus::Abandoned => EndReason::Abandoned,
            _ => return None,
        };

        let id_of = |seat: Seat| self.player(seat).player_id.clone();
        let decided = |winner: Seat| Outcome::Decided {
            winner: id_of(winner),
            loser: id_of(winner.other()),
        };

        let (one, two) = (self.turn.score(Seat::One), self.turn.score(Seat::Two));
        let outcome = match (reason, self.forfeited_by) {
            (EndReason::Abandoned, Some(forfeiter)) => decided(forfeiter.other()),
            (EndReason::Abandoned, None) => Outcome::Draw,
            (EndReason::Completed, _) if one > two => decided(Seat::One),
            (EndReason::Completed, _) if two > one => decided(Seat::Two),
            (EndReason::Completed, _) => Outcome::Draw,
        };

        Some(GameResult {
            session_id: self.id.clone(),
            players: Seat::ALL.map(|seat| PlayerResult {
                player_id: id_of(seat),
                seat,
                score: self.turn.score(seat),
            }),
            outcome,
            reason,
            forfeited_by: self.forfeited_by.map(id_of),
            rounds_played: self.turn.round(),
            ended_at: self.ended_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{EmptyFill, SeededCellSource};

    // Top row holds a five-cell pink run; nothing else touches its own color
    const FIVE_RUN: &str = "KKKKKYP\nPGBYPGB\nBYPGBYP\nPGBYPGB\nBYPGBYP\nPGBYPGB\nBYPGBYP\nPGBYPGB";

    fn alice() -> PlayerProfile {
        PlayerProfile::new("alice", "Alice")
    }

    fn bob() -> PlayerProfile {
        PlayerProfile::new("bob", "Bob")
    }

    fn connect_both(session: &mut GameSession) {
        for player_id in ["alice", "bob"] {
            session
                .apply(SessionOperation::Connect {
                    player_id: player_id.to_string(),
                })
                .unwrap();
        }
    }

    fn seeded_session(seed: u64) -> GameSession {
        let mut source = SeededCellSource::new(seed);
        let board = Board::generate(&mut source).unwrap();
        let mut session = GameSession::new(
            "s-1".to_string(),
            alice(),
            bob(),
            board,
            Box::new(source),
            &GameConfig::default(),
        );
        connect_both(&mut session);
        session
    }

    fn fixture_session() -> GameSession {
        let mut session = GameSession::new(
            "s-1".to_string(),
            alice(),
            bob(),
            FIVE_RUN.parse().unwrap(),
            Box::new(EmptyFill),
            &GameConfig::default(),
        );
        connect_both(&mut session);
        session
    }

    fn playable_move(session: &GameSession) -> Move {
        let (_, cells) = session.board().groups(3).remove(0);
        Move::pop(cells[0].x, cells[0].y)
    }

    fn submit(session: &mut GameSession, player_id: &str, mv: Move) -> Result<Transition, AppError> {
        session.apply(SessionOperation::SubmitMove {
            player_id: player_id.to_string(),
            mv,
        })
    }

    fn moved_points(transition: &Transition) -> u32 {
        transition
            .events
            .iter()
            .find_map(|event| match event {
                SessionEvent::MoveApplied(applied) => Some(applied.points),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn starts_once_both_seats_connect() {
        let mut session = GameSession::new(
            "s-1".to_string(),
            alice(),
            bob(),
            FIVE_RUN.parse().unwrap(),
            Box::new(EmptyFill),
            &GameConfig::default(),
        );
        let first = session
            .apply(SessionOperation::Connect {
                player_id: "alice".to_string(),
            })
            .unwrap();
        assert_eq!(session.status(), SessionStatus::WaitingForPlayers);
        assert!(first.timers.is_empty());

        let second = session
            .apply(SessionOperation::Connect {
                player_id: "bob".to_string(),
            })
            .unwrap();
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(second.timers, vec![TimerRequest::Turn { turn_seq: 0 }]);
        assert!(matches!(
            second.events.last(),
            Some(SessionEvent::StateUpdated(_))
        ));
    }

    #[test]
    fn moves_before_start_are_rejected() {
        let mut session = GameSession::new(
            "s-1".to_string(),
            alice(),
            bob(),
            FIVE_RUN.parse().unwrap(),
            Box::new(EmptyFill),
            &GameConfig::default(),
        );
        let err = submit(&mut session, "alice", Move::pop(0, 7)).unwrap_err();
        assert!(matches!(err, AppError::SessionNotActive(_)));
    }

    #[test]
    fn wrong_turn_changes_nothing() {
        let mut session = fixture_session();
        let before = session.snapshot();

        let err = submit(&mut session, "bob", Move::pop(0, 7)).unwrap_err();
        assert!(matches!(err, AppError::WrongTurn));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn illegal_move_keeps_turn_and_moves() {
        let mut session = fixture_session();
        let err = submit(&mut session, "alice", Move::pop(3, 3)).unwrap_err();

        assert!(matches!(
            err,
            AppError::IllegalMove(IllegalMove::GroupTooSmall { size: 1 })
        ));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.moves_remaining, 2);
        assert_eq!(snapshot.active_player.as_deref(), Some("alice"));
    }

    #[test]
    fn unknown_player_is_not_found() {
        let mut session = fixture_session();
        let err = submit(&mut session, "mallory", Move::pop(0, 7)).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn big_group_earns_a_bomb_that_can_be_spent() {
        let mut session = fixture_session();

        let popped = submit(&mut session, "alice", Move::pop(0, 7)).unwrap();
        assert_eq!(moved_points(&popped), 100);
        assert_eq!(session.bombs(Seat::One), 1);

        let blasted = submit(&mut session, "alice", Move::bomb(3, 3)).unwrap();
        assert_eq!(moved_points(&blasted), 280);
        assert_eq!(session.bombs(Seat::One), 0);
        assert_eq!(session.turn().score(Seat::One), 380);
        assert_eq!(session.snapshot().active_player.as_deref(), Some("bob"));
    }

    #[test]
    fn bomb_without_stock_is_rejected_without_using_a_move() {
        let mut session = fixture_session();
        let err = submit(&mut session, "alice", Move::bomb(3, 3)).unwrap_err();

        assert!(matches!(err, AppError::IllegalMove(IllegalMove::NoBombs)));
        assert_eq!(session.turn().moves_remaining(), 2);
    }

    #[test]
    fn full_game_completes_with_summed_scores() {
        let mut session = seeded_session(11);
        let mut totals = [0u32; 2];
        let mut accepted = 0;

        while session.status() == SessionStatus::InProgress {
            let active = session.snapshot().active_player.unwrap();
            let seat = session.seat_of(&active).unwrap();
            let mv = playable_move(&session);
            let transition = submit(&mut session, &active, mv).unwrap();
            totals[seat.index()] += moved_points(&transition);
            accepted += 1;
        }

        assert_eq!(accepted, 20);
        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.turn().score(Seat::One), totals[0]);
        assert_eq!(session.turn().score(Seat::Two), totals[1]);

        let result = session.final_result().unwrap();
        assert_eq!(result.reason, EndReason::Completed);
        assert_eq!(result.players[0].score, totals[0]);
    }

    #[test]
    fn stale_turn_timer_is_ignored() {
        let mut session = fixture_session();
        let stale = session
            .apply(SessionOperation::ExpireTurn { turn_seq: 7 })
            .unwrap();
        assert!(stale.events.is_empty());

        let fired = session
            .apply(SessionOperation::ExpireTurn { turn_seq: 0 })
            .unwrap();
        assert!(matches!(fired.events[0], SessionEvent::TurnSkipped(_)));
        assert_eq!(session.snapshot().active_player.as_deref(), Some("bob"));
        assert_eq!(fired.timers, vec![TimerRequest::Turn { turn_seq: 1 }]);
    }

    #[test]
    fn absence_past_timeout_forfeits() {
        let mut session = fixture_session();
        let transition = session
            .apply(SessionOperation::Disconnect {
                player_id: "bob".to_string(),
            })
            .unwrap();
        assert_eq!(
            transition.timers,
            vec![TimerRequest::Disconnect {
                player_id: "bob".to_string(),
                epoch: 1
            }]
        );

        session
            .apply(SessionOperation::ExpireDisconnect {
                player_id: "bob".to_string(),
                epoch: 1,
            })
            .unwrap();
        assert_eq!(session.status(), SessionStatus::Abandoned);

        let result = session.final_result().unwrap();
        assert_eq!(result.reason, EndReason::Abandoned);
        assert_eq!(result.winner(), Some("alice"));
        assert_eq!(result.forfeited_by.as_deref(), Some("bob"));
    }

    #[test]
    fn reconnect_cancels_pending_forfeit() {
        let mut session = fixture_session();
        session
            .apply(SessionOperation::Disconnect {
                player_id: "bob".to_string(),
            })
            .unwrap();
        session
            .apply(SessionOperation::Connect {
                player_id: "bob".to_string(),
            })
            .unwrap();
        session
            .apply(SessionOperation::ExpireDisconnect {
                player_id: "bob".to_string(),
                epoch: 1,
            })
            .unwrap();

        assert_eq!(session.status(), SessionStatus::InProgress);
    }

    #[test]
    fn nobody_showing_up_is_a_draw() {
        let mut session = GameSession::new(
            "s-1".to_string(),
            alice(),
            bob(),
            FIVE_RUN.parse().unwrap(),
            Box::new(EmptyFill),
            &GameConfig::default(),
        );
        session
            .apply(SessionOperation::ExpireDisconnect {
                player_id: "alice".to_string(),
                epoch: 0,
            })
            .unwrap();

        let result = session.final_result().unwrap();
        assert!(result.is_draw());
        assert_eq!(result.forfeited_by, None);
    }

    #[test]
    fn terminal_session_ignores_presence() {
        let mut session = fixture_session();
        session
            .apply(SessionOperation::Disconnect {
                player_id: "bob".to_string(),
            })
            .unwrap();
        session
            .apply(SessionOperation::ExpireDisconnect {
                player_id: "bob".to_string(),
                epoch: 1,
            })
            .unwrap();

        let reconnect = session
            .apply(SessionOperation::Connect {
                player_id: "bob".to_string(),
            })
            .unwrap();
        assert!(reconnect.events.is_empty());
        assert_eq!(session.status(), SessionStatus::Abandoned);
    }
}
