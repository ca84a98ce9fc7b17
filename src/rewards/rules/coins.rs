use super::super::{GameResult, RewardDelta, RewardRule};
use crate::rewards::rule_priority;

/// Pays a percentage of the player's own final score, truncated
pub struct CoinRule {
    percent: u32,
}

impl CoinRule {
    pub fn new(percent: u32) -> Self {
        Self { percent }
    }
}

impl RewardRule for CoinRule {
    fn apply(&self, player_id: &str, result: &GameResult, mut delta: RewardDelta) -> RewardDelta {
        let score = result.player(player_id).map(|p| p.score).unwrap_or_default();
        let coins = u64::from(score) * u64::from(self.percent) / 100;
        delta.coins += u32::try_from(coins).unwrap_or(u32::MAX);
        delta
    }

    fn priority(&self) -> u32 {
        rule_priority::COINS
    }
}
