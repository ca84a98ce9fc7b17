use std::sync::Arc;

use super::rules::{CoinRule, StarRule, TrophyRule};
use super::{GameResult, RewardDelta, RewardRule};
use crate::config::RewardConfig;

/// Runs reward rules in priority order for each player.
///
/// Each player's delta depends only on the result, so the two players can be
/// computed in either order.
pub struct RewardCalculator {
    rules: Vec<Arc<dyn RewardRule>>,
}

impl RewardCalculator {
    pub fn new(config: &RewardConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: &RewardConfig) -> RewardCalculatorBuilder {
        RewardCalculatorBuilder::new(config)
    }

    /// Deltas in the same order as `result.players`
    pub fn calculate(&self, result: &GameResult) -> [RewardDelta; 2] {
        let [one, two] = &result.players;
        [
            self.calculate_for(&one.player_id, result),
            self.calculate_for(&two.player_id, result),
        ]
    }

    pub fn calculate_for(&self, player_id: &str, result: &GameResult) -> RewardDelta {
        self.rules
            .iter()
            .fold(RewardDelta::new(player_id), |delta, rule| {
                rule.apply(player_id, result, delta)
            })
    }
}

pub struct RewardCalculatorBuilder {
    rules: Vec<Arc<dyn RewardRule>>,
}

impl RewardCalculatorBuilder {
    fn new(config: &RewardConfig) -> Self {
        Self {
            rules: vec![
                Arc::new(TrophyRule::new(config.win_trophies, config.loss_trophies)),
                Arc::new(CoinRule::new(config.coin_percent)),
                Arc::new(StarRule::new(config.three_star_margin)),
            ],
        }
    }

    pub fn with_rule(mut self, rule: Arc<dyn RewardRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn build(mut self) -> RewardCalculator {
        self.rules.sort_by_key(|rule| rule.priority());
        RewardCalculator { rules: self.rules }
    }
}
