use super::super::{GameResult, RewardDelta, RewardRule};
use crate::rewards::rule_priority;

/// Fixed trophy swing for winner and loser, nothing on a draw
pub struct TrophyRule {
    win: i32,
    loss: i32,
}

impl TrophyRule {
    pub fn new(win: i32, loss: i32) -> Self {
        Self { win, loss }
    }
}

impl RewardRule for TrophyRule {
    fn apply(&self, player_id: &str, result: &GameResult, mut delta: RewardDelta) -> RewardDelta {
        delta.trophies += match result.winner() {
            Some(winner) if winner == player_id => self.win,
            Some(_) => self.loss,
            None => 0,
        };
        delta
    }

    fn priority(&self) -> u32 {
        rule_priority::TROPHIES
    }
}
