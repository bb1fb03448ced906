use std::collections::HashMap;
use std::hash::Hash;

use crate::core::message::ShapeId;

/// Two-way map between the diagram engine's shape handles and the stable
/// ids shapes carry on the wire.
#[derive(Debug)]
pub struct ShapeIdentities<H> {
    ids: HashMap<H, ShapeId>,
    handles: HashMap<ShapeId, H>,
}

impl<H: Clone + Eq + Hash> ShapeIdentities<H> {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            handles: HashMap::new(),
        }
    }

    /// Bind `handle` to `id`, or to a fresh id when none is given or the
    /// given one already belongs to another shape. Registering a known
    /// handle changes nothing and returns its id.
    pub fn register(&mut self, handle: H, id: Option<ShapeId>) -> ShapeId {
        if let Some(existing) = self.ids.get(&handle) {
            return existing.clone();
        }

        let id = match id {
            Some(id) if !self.handles.contains_key(&id) => id,
            _ => ShapeId::generate(),
        };

        self.ids.insert(handle.clone(), id.clone());
        self.handles.insert(id.clone(), handle);
        id
    }

    pub fn id_of(&self, handle: &H) -> Option<&ShapeId> {
        self.ids.get(handle)
    }

    pub fn handle_of(&self, id: &ShapeId) -> Option<&H> {
        self.handles.get(id)
    }

    pub fn contains_id(&self, id: &ShapeId) -> bool {
        self.handles.contains_key(id)
    }

    /// Drop both directions of the mapping
    pub fn unregister(&mut self, handle: &H) -> Option<ShapeId> {
        let id = self.ids.remove(handle)?;
        self.handles.remove(&id);
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<H: Clone + Eq + Hash> Default for ShapeIdentities<H> {
    fn default() -> Self {
        Self::new()
    }
}
