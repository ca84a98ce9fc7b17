// WebSocket transport for players
//
// Each socket is a Connection pumping an outbound channel registered with the
// ConnectionManager. Inbound JSON messages go to SessionMessageHandler, which
// drives matchmaking and the session registry.

// Public API
pub use connection_manager::{ConnectionId, ConnectionManager, InMemoryConnectionManager};
pub use handler::{get_session, websocket_handler, SessionMessageHandler};
pub use messages::{MessageType, WebSocketMessage};
pub use socket::{Connection, MessageHandler, SocketError, SocketWrapper};

// Internal modules
mod connection_manager;
mod handler;
pub mod messages;
mod socket;
