// Turn state machine and the per-session game aggregate

// Public API
pub use session::{
    GameSession, SeatSnapshot, SessionId, SessionOperation, SessionSnapshot, TimerRequest,
    Transition,
};
pub use turn::{opener_for, Seat, SessionStatus, TurnAdvance, TurnError, TurnState};

// Internal modules
mod session;
mod turn;
