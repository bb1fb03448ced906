//! The diagram engine seam
//!
//! Rendering, hit-testing and gestures belong to an external diagram
//! engine. The translator only needs to create, update, connect and delete
//! shapes through it, and to be told what the user did.

use std::fmt::Debug;
use std::hash::Hash;

use crate::core::message::{Position, ShapeAddParam, ShapeProps, ShapeUpdate};

/// A named anchor on a shape, as the engine sees it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnginePort<H> {
    pub shape: H,
    pub key: String,
}

impl<H> EnginePort<H> {
    pub fn new(shape: H, key: impl Into<String>) -> Self {
        Self {
            shape,
            key: key.into(),
        }
    }
}

/// What the engine reports. `TextUpdate` and `Delete` come from the shapes
/// themselves and only count once the shape has been announced by `Add`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent<H> {
    Add { target: H },
    Move { target: H, position: Position },
    Connect { start: EnginePort<H>, end: EnginePort<H> },
    Disconnect { start: EnginePort<H>, end: EnginePort<H> },
    TextUpdate { target: H, props: ShapeProps },
    Delete { target: H },
}

pub trait DiagramEngine {
    /// Opaque reference to a shape owned by the engine
    type Handle: Clone + Eq + Hash + Debug;

    fn shape_add(&mut self, param: &ShapeAddParam) -> Self::Handle;

    fn shape_update(&mut self, shape: &Self::Handle, update: &ShapeUpdate);

    fn shape_connect(&mut self, start: &EnginePort<Self::Handle>, end: &EnginePort<Self::Handle>);

    fn shape_del(&mut self, shape: &Self::Handle);
}
