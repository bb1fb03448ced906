// Shared fixtures for the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;

use chartroom::client::{DiagramEngine, EnginePort};
use chartroom::core::{Position, RoomRegistry, ShapeAddParam, ShapeProps, ShapeUpdate};
use chartroom::handlers::chart_routes;

/// What the fake engine currently draws for one shape
#[derive(Debug, Clone, PartialEq)]
pub struct FakeShape {
    pub template_key: String,
    pub position: Position,
    pub text: String,
}

/// In-memory diagram engine that records every call made on it
#[derive(Debug, Default)]
pub struct FakeEngine {
    next: u64,
    pub shapes: HashMap<u64, FakeShape>,
    pub adds: Vec<ShapeAddParam>,
    pub updates: Vec<(u64, ShapeUpdate)>,
    pub connects: Vec<(EnginePort<u64>, EnginePort<u64>)>,
    pub dels: Vec<u64>,
}

impl DiagramEngine for FakeEngine {
    type Handle = u64;

    fn shape_add(&mut self, param: &ShapeAddParam) -> u64 {
        self.next += 1;
        self.adds.push(param.clone());
        self.shapes.insert(
            self.next,
            FakeShape {
                template_key: param.template_key.clone(),
                position: param.position,
                text: param.props.text_content().unwrap_or_default().to_string(),
            },
        );
        self.next
    }

    fn shape_update(&mut self, shape: &u64, update: &ShapeUpdate) {
        self.updates.push((*shape, update.clone()));
        if let Some(drawn) = self.shapes.get_mut(shape) {
            if let Some(position) = update.position {
                drawn.position = position;
            }
            if let Some(text) = update.props.as_ref().and_then(ShapeProps::text_content) {
                drawn.text = text.to_string();
            }
        }
    }

    fn shape_connect(&mut self, start: &EnginePort<u64>, end: &EnginePort<u64>) {
        self.connects.push((start.clone(), end.clone()));
    }

    fn shape_del(&mut self, shape: &u64) {
        self.dels.push(*shape);
        self.shapes.remove(shape);
    }
}

pub fn add_param(template: &str, x: f64, y: f64, text: &str) -> ShapeAddParam {
    ShapeAddParam {
        id: None,
        template_key: template.to_string(),
        position: Position::new(x, y),
        props: ShapeProps::with_text(text),
    }
}

/// Serve the full route tree on an ephemeral local port
pub fn spawn_server() -> (SocketAddr, RoomRegistry) {
    let registry = RoomRegistry::new(64);
    let (addr, server) =
        warp::serve(chart_routes(registry.clone())).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, registry)
}
