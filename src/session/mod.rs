// Session registry
//
// Owns live sessions, serializes operations per session, runs turn and
// disconnect clocks, and hands finished sessions to the result sink.

// Public API
pub use registry::SessionRegistry;

// Internal modules
mod registry;
