//! Per-room actor
//!
//! Every room runs as one tokio task that exclusively owns the membership
//! list. Sockets talk to it through a [`RoomHandle`]; commands are handled
//! one at a time, so joins, broadcasts and evictions never interleave
//! within a room while different rooms run independently.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::core::room_id::RoomId;
use crate::core::session::{Session, SessionId};
use crate::error::{ChartRoomError, Result};

/// A frame to fan out. Anything that is not already text is serialized to
/// JSON before sending.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomPayload {
    Text(String),
    Json(Value),
}

impl RoomPayload {
    pub fn into_text(self) -> String {
        match self {
            RoomPayload::Text(text) => text,
            RoomPayload::Json(value) => value.to_string(),
        }
    }
}

impl From<String> for RoomPayload {
    fn from(text: String) -> Self {
        RoomPayload::Text(text)
    }
}

impl From<&str> for RoomPayload {
    fn from(text: &str) -> Self {
        RoomPayload::Text(text.to_string())
    }
}

impl From<Value> for RoomPayload {
    fn from(value: Value) -> Self {
        RoomPayload::Json(value)
    }
}

impl From<Vec<u8>> for RoomPayload {
    fn from(bytes: Vec<u8>) -> Self {
        RoomPayload::Json(Value::from(bytes))
    }
}

/// Room state. Only the actor task touches it.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    sessions: Vec<Arc<Session>>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            sessions: Vec::new(),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Append a freshly upgraded session to the membership
    pub fn accept_session(&mut self, session: Arc<Session>) {
        info!("Session {} joined room {}", session.id(), self.id);
        self.sessions.push(session);
        debug!("Room {} now has {} sessions", self.id, self.sessions.len());
    }

    /// Relay an inbound frame to every member, the sender included
    pub fn on_message(&mut self, from: SessionId, payload: RoomPayload) -> usize {
        let delivered = self.broadcast(payload);
        debug!("Relayed frame from {} to {} sessions in room {}", from, delivered, self.id);
        delivered
    }

    /// Send to every member. A session whose send fails is marked quit and
    /// dropped from the membership; the others are unaffected.
    pub fn broadcast(&mut self, payload: impl Into<RoomPayload>) -> usize {
        let text = payload.into().into_text();
        let room_id = self.id;

        self.sessions.retain(|session| {
            if session.send_text(&text) {
                true
            } else {
                session.mark_quit();
                warn!("Evicting dead session {} from room {}", session.id(), room_id);
                false
            }
        });

        self.sessions.len()
    }

    /// Transport closed or errored. Safe to call for an already evicted session.
    pub fn on_close_or_error(&mut self, session_id: SessionId) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|session| {
            if session.id() == session_id {
                session.mark_quit();
                false
            } else {
                true
            }
        });

        let removed = self.sessions.len() != before;
        if removed {
            info!("Session {} left room {}", session_id, self.id);
        }
        removed
    }

    pub fn member_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn member_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|s| s.id()).collect()
    }

    pub fn has_member(&self, session_id: SessionId) -> bool {
        self.sessions.iter().any(|s| s.id() == session_id)
    }

    fn handle_command(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join(session) => self.accept_session(session),
            RoomCommand::Frame { from, payload } => {
                self.on_message(from, payload);
            }
            RoomCommand::Leave(session_id) => {
                self.on_close_or_error(session_id);
            }
            RoomCommand::Members(reply) => {
                let _ = reply.send(self.member_ids());
            }
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>) {
        info!("Room {} started", self.id);
        while let Some(command) = rx.recv().await {
            self.handle_command(command);
        }
        info!("Room {} stopped", self.id);
    }
}

#[derive(Debug)]
pub enum RoomCommand {
    Join(Arc<Session>),
    Frame { from: SessionId, payload: RoomPayload },
    Leave(SessionId),
    Members(oneshot::Sender<Vec<SessionId>>),
}

/// Cloneable address of a running room actor
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: RoomId,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Start the actor task for `id`. Must be called inside a tokio runtime.
    pub fn spawn(id: RoomId, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity);
        tokio::spawn(Room::new(id).run(rx));
        Self { id, tx }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub async fn join(&self, session: Arc<Session>) -> Result<()> {
        self.send(RoomCommand::Join(session)).await
    }

    pub async fn deliver(&self, from: SessionId, payload: RoomPayload) -> Result<()> {
        self.send(RoomCommand::Frame { from, payload }).await
    }

    pub async fn leave(&self, session_id: SessionId) -> Result<()> {
        self.send(RoomCommand::Leave(session_id)).await
    }

    /// Snapshot of the current membership, in join order
    pub async fn members(&self) -> Result<Vec<SessionId>> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Members(reply)).await?;
        rx.await
            .map_err(|_| ChartRoomError::RoomUnavailable(self.id.to_string()))
    }

    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }

    async fn send(&self, command: RoomCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| ChartRoomError::RoomUnavailable(self.id.to_string()))
    }
}
