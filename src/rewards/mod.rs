// Reward calculation for finished sessions
//
// A GameResult goes through a prioritised list of rules that each adjust a
// player's RewardDelta. The result and both deltas are then handed to a
// ResultSink.

// Public API
pub use calculator::{RewardCalculator, RewardCalculatorBuilder};
pub use errors::PersistenceError;
pub use models::{EndReason, GameResult, Outcome, PlayerResult, RewardDelta};
pub use sink::{InMemoryResultSink, PersistedResult, ResultSink};

// Internal modules
mod calculator;
mod errors;
mod models;
pub mod rules;
mod sink;

/// Priority constants for reward rules. Lower values run first.
pub mod rule_priority {
    pub const TROPHIES: u32 = 100;
    pub const COINS: u32 = 200;
    pub const STARS: u32 = 300;
}

pub trait RewardRule: Send + Sync {
    fn apply(&self, player_id: &str, result: &GameResult, delta: RewardDelta) -> RewardDelta;

    fn priority(&self) -> u32;
}
