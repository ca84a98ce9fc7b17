// Session event vocabulary and the realtime broadcaster
//
// Every state change of a session becomes a SessionEvent. The Broadcaster
// keeps one ordered channel per session and fans events out to subscribers.

// Public API
pub use bus::{Broadcaster, SubscriberId, Subscription};
pub use events::{
    MatchFound, MoveApplied, PresenceChanged, SessionEnded, SessionEvent, TurnSkipped,
};
pub use notifier::PlayerNotifier;

// Internal modules
mod bus;
mod events;
mod notifier;
