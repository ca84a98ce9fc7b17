mod coins;
mod stars;
mod trophies;

pub use coins::CoinRule;
pub use stars::StarRule;
pub use trophies::TrophyRule;
