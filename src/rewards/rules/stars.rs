use super::super::{GameResult, RewardDelta, RewardRule};
use crate::rewards::rule_priority;

/// Three stars for a clear win, two for any other win, one otherwise
pub struct StarRule {
    three_star_margin: i64,
}

impl StarRule {
    pub fn new(three_star_margin: i64) -> Self {
        Self { three_star_margin }
    }
}

impl RewardRule for StarRule {
    fn apply(&self, player_id: &str, result: &GameResult, mut delta: RewardDelta) -> RewardDelta {
        let won = result.winner() == Some(player_id);
        let own = result.player(player_id).map(|p| i64::from(p.score)).unwrap_or_default();
        let other = result
            .opponent(player_id)
            .map(|p| i64::from(p.score))
            .unwrap_or_default();

        delta.stars = match won {
            true if own - other >= self.three_star_margin => 3,
            true => 2,
            false => 1,
        };
        delta
    }

    fn priority(&self) -> u32 {
        rule_priority::STARS
    }
}
