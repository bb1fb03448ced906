//! Core room server and protocol types

pub mod message;
pub mod registry;
pub mod room;
pub mod room_id;
pub mod session;
pub mod snapshot;

// Re-export main components for convenience
pub use message::{ConnectParam, Position, ShapeAddParam, ShapeId, ShapeProps, ShapeUpdate, WireMessage};
pub use registry::RoomRegistry;
pub use room::{Room, RoomHandle, RoomPayload};
pub use room_id::RoomId;
pub use session::{Session, SessionId};
pub use snapshot::Snapshot;
