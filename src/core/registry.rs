//! Lazily created room actors, at most one per identity

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::info;

use crate::core::room::RoomHandle;
use crate::core::room_id::RoomId;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<RoomId, RoomHandle>>>,
    queue_capacity: usize,
}

impl RoomRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            queue_capacity,
        }
    }

    /// Return the actor for `id`, spawning it on first access
    pub fn get_or_create(&self, id: RoomId) -> Result<RoomHandle> {
        let mut rooms = self.rooms.lock()?;
        let handle = rooms.entry(id).or_insert_with(|| {
            info!("Creating room {}", id);
            RoomHandle::spawn(id, self.queue_capacity)
        });
        Ok(handle.clone())
    }

    pub fn contains(&self, id: &RoomId) -> Result<bool> {
        Ok(self.rooms.lock()?.contains_key(id))
    }

    pub fn room_count(&self) -> Result<usize> {
        Ok(self.rooms.lock()?.len())
    }
}
