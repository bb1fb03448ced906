//! Client side: translating diagram edits to wire operations and keeping a
//! room connection alive

pub mod connection;
pub mod engine;
pub mod identity;
pub mod reconnect;
pub mod translator;

pub use connection::{create_private_room, ConnectionManager, OperationSink, Transport};
pub use engine::{DiagramEngine, EngineEvent, EnginePort};
pub use identity::ShapeIdentities;
pub use reconnect::ReconnectPolicy;
pub use translator::{DiagramTranslator, ShapeRecord, TranslatorEvent};
