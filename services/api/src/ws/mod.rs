//! WebSocket Game Sessions
//!
//! - `protocol`: the JSON message format between browser and server.
//! - `session`: one engine per connection, from handshake to teardown.
//! - `speech`: gating the round timer on the browser's spoken command.

pub mod protocol;
pub mod session;
pub mod speech;

pub use session::ws_handler;
