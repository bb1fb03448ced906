use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::Message as WsMessage;

use crate::core::room_id::RoomId;

pub type SessionId = Uuid;

/// One client's live socket in a room.
///
/// The sender feeds the task that writes to the WebSocket; once that task
/// is gone every send fails and the room evicts the session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    room: RoomId,
    sender: mpsc::UnboundedSender<WsMessage>,
    quit: AtomicBool,
}

impl Session {
    pub fn new(room: RoomId, sender: mpsc::UnboundedSender<WsMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room,
            sender,
            quit: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn room(&self) -> RoomId {
        self.room
    }

    /// Send a text frame through this session
    pub fn send_text(&self, text: &str) -> bool {
        match self.sender.send(WsMessage::text(text)) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to send message to session {}", self.id);
                false
            }
        }
    }

    /// Queue a raw frame (close frames, error frames)
    pub fn send_frame(&self, message: WsMessage) -> bool {
        self.sender.send(message).is_ok()
    }

    pub fn is_quit(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    /// Flag the session as dead. Returns true only for the call that set it.
    pub(crate) fn mark_quit(&self) -> bool {
        !self.quit.swap(true, Ordering::AcqRel)
    }
}
