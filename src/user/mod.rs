pub mod identity;

pub use identity::{IdentityError, IdentityLookup, InMemoryIdentityLookup, PlayerId, PlayerProfile};
