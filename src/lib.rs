//! chartroom - collaborative diagram editing over WebSocket
//!
//! The server side routes `/api/chart/<name>/websocket` to one actor per
//! room, which relays every frame to all sockets in that room. The client
//! side translates diagram-engine events into `{type, msg}` frames and
//! applies incoming frames back onto the diagram.

pub mod client;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;

// Re-export main components
pub use config::*;
pub use constants::*;
