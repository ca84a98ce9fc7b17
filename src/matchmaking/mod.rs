// Matchmaking queue and pairing

// Public API
pub use queue::{JoinOutcome, MatchRequest, MatchmakingQueue};
pub use service::{MatchStatus, MatchmakingService};

// Internal modules
mod queue;
mod service;
