use serde::{Deserialize, Serialize};

use crate::config::{RoundOpener, RulesConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::One, Seat::Two];

    pub fn other(self) -> Seat {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::One => 0,
            Seat::Two => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    WaitingForPlayers,
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("Session is not in progress")]
    NotInProgress,
    #[error("Not this player's turn")]
    WrongTurn,
}

/// What happened to control after a move or a skipped turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnAdvance {
    /// The same seat keeps moving
    Continues,
    /// Control passed to the given seat
    Passed(Seat),
    Completed,
}

/// Round and turn bookkeeping for one session.
///
/// Each round is two turns: the opener's, then the other seat's. The round
/// index never decreases.
#[derive(Debug, Clone)]
pub struct TurnState {
    status: SessionStatus,
    round: u32,
    total_rounds: u32,
    moves_per_turn: u32,
    opener_rule: RoundOpener,
    active: Seat,
    moves_remaining: u32,
    opener_finished: bool,
    scores: [u32; 2],
    turn_seq: u64,
}

impl TurnState {
    pub fn new(rules: &RulesConfig) -> Self {
        let opener = opener_for(rules.round_opener, 1);
        Self {
            status: SessionStatus::WaitingForPlayers,
            round: 1,
            total_rounds: rules.total_rounds.max(1),
            moves_per_turn: rules.moves_per_turn.max(1),
            opener_rule: rules.round_opener,
            active: opener,
            moves_remaining: rules.moves_per_turn.max(1),
            opener_finished: false,
            scores: [0, 0],
            turn_seq: 0,
        }
    }

    /// Moves a waiting session into play. Returns false if it was not waiting.
    pub fn start(&mut self) -> bool {
        if self.status != SessionStatus::WaitingForPlayers {
            return false;
        }
        self.status = SessionStatus::InProgress;
        true
    }

    pub fn check_move(&self, seat: Seat) -> Result<(), TurnError> {
        if self.status != SessionStatus::InProgress {
            return Err(TurnError::NotInProgress);
        }
        if seat != self.active || self.moves_remaining == 0 {
            return Err(TurnError::WrongTurn);
        }
        Ok(())
    }

    /// Records an accepted move for `seat` and its points
    pub fn record_move(&mut self, seat: Seat, points: u32) -> Result<TurnAdvance, TurnError> {
        self.check_move(seat)?;
        self.scores[seat.index()] += points;
        self.moves_remaining -= 1;
        if self.moves_remaining > 0 {
            return Ok(TurnAdvance::Continues);
        }
        Ok(self.end_turn())
    }

    /// Gives up whatever is left of the active turn
    pub fn forfeit_turn(&mut self) -> Result<TurnAdvance, TurnError> {
        if self.status != SessionStatus::InProgress {
            return Err(TurnError::NotInProgress);
        }
        Ok(self.end_turn())
    }

    pub fn abandon(&mut self) {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Abandoned;
            self.moves_remaining = 0;
        }
    }

    fn end_turn(&mut self) -> TurnAdvance {
        self.turn_seq += 1;

        if !self.opener_finished {
            self.opener_finished = true;
            self.active = self.active.other();
            self.moves_remaining = self.moves_per_turn;
            return TurnAdvance::Passed(self.active);
        }

        if self.round >= self.total_rounds {
            self.status = SessionStatus::Completed;
            self.moves_remaining = 0;
            return TurnAdvance::Completed;
        }

        self.round += 1;
        self.opener_finished = false;
        self.active = opener_for(self.opener_rule, self.round);
        self.moves_remaining = self.moves_per_turn;
        TurnAdvance::Passed(self.active)
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    /// `None` outside of play
    pub fn active(&self) -> Option<Seat> {
        (self.status == SessionStatus::InProgress).then_some(self.active)
    }

    pub fn moves_remaining(&self) -> u32 {
        self.moves_remaining
    }

    pub fn score(&self, seat: Seat) -> u32 {
        self.scores[seat.index()]
    }

    /// Bumped every time control passes
    pub fn turn_seq(&self) -> u64 {
        self.turn_seq
    }
}

/// The seat that acts first in `round`
pub fn opener_for(rule: RoundOpener, round: u32) -> Seat {
    match rule {
        RoundOpener::SeatOne => Seat::One,
        RoundOpener::Alternate if round % 2 == 1 => Seat::One,
        RoundOpener::Alternate => Seat::Two,
    }
}
