//! Request handlers for the chart endpoints

pub mod chart;
pub mod websocket;

// Re-export the route tree and the socket handler
pub use chart::chart_routes;
pub use websocket::handle_room_session;
