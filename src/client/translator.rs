//! Diagram event translator
//!
//! Sits between the diagram engine and the network. Local engine events
//! become [`TranslatorEvent`]s on an unbounded per-subscriber bus (the
//! connection manager forwards them as wire frames); inbound wire operations are applied back
//! onto the engine idempotently, keyed by [`ShapeId`].
//!
//! Deletion stays local: removing a shape updates the engine, the identity
//! map and any connectors touching it, but nothing is sent. Engine
//! `Disconnect` events are ignored.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::client::connection::OperationSink;
use crate::client::engine::{DiagramEngine, EngineEvent, EnginePort};
use crate::client::identity::ShapeIdentities;
use crate::core::message::{
    ConnectParam, Position, ShapeAddParam, ShapeId, ShapeProps, ShapeUpdate, WireMessage,
};
use crate::core::snapshot::{Snapshot, SnapshotConnector, SnapshotPort, SnapshotShape};
use crate::error::{ChartRoomError, Result};

/// Network-ready events produced from local edits
#[derive(Debug, Clone, PartialEq)]
pub enum TranslatorEvent {
    ShapeAdd(ShapeAddParam),
    Update(ShapeUpdate),
    Connect(ConnectParam),
}

impl From<TranslatorEvent> for WireMessage {
    fn from(event: TranslatorEvent) -> Self {
        match event {
            TranslatorEvent::ShapeAdd(param) => WireMessage::Add(param),
            TranslatorEvent::Update(update) => WireMessage::Update(update),
            TranslatorEvent::Connect(param) => WireMessage::Connect(param),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRecord {
    pub id: ShapeId,
    pub template_key: String,
    pub position: Position,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorEndpoint {
    pub shape_id: ShapeId,
    pub port_key: String,
}

/// A connector between two ports. The same two endpoints in either
/// direction count as one connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectorRecord {
    pub start: ConnectorEndpoint,
    pub end: ConnectorEndpoint,
}

impl ConnectorRecord {
    /// Order-independent dedup key
    pub fn key(&self) -> (ConnectorEndpoint, ConnectorEndpoint) {
        if self.start <= self.end {
            (self.start.clone(), self.end.clone())
        } else {
            (self.end.clone(), self.start.clone())
        }
    }

    pub fn touches(&self, id: &ShapeId) -> bool {
        self.start.shape_id == *id || self.end.shape_id == *id
    }

    pub fn to_param(&self) -> ConnectParam {
        ConnectParam::new(
            self.start.shape_id.clone(),
            &self.start.port_key,
            self.end.shape_id.clone(),
            &self.end.port_key,
        )
    }
}

impl From<&ConnectParam> for ConnectorRecord {
    fn from(param: &ConnectParam) -> Self {
        Self {
            start: ConnectorEndpoint {
                shape_id: param.s.i.clone(),
                port_key: param.s.c.clone(),
            },
            end: ConnectorEndpoint {
                shape_id: param.e.i.clone(),
                port_key: param.e.c.clone(),
            },
        }
    }
}

pub struct DiagramTranslator<E: DiagramEngine> {
    engine: E,
    identities: ShapeIdentities<E::Handle>,
    records: HashMap<ShapeId, ShapeRecord>,
    /// Creation order, used for snapshots
    order: Vec<ShapeId>,
    connectors: Vec<ConnectorRecord>,
    connector_keys: HashSet<(ConnectorEndpoint, ConnectorEndpoint)>,
    /// Shapes whose text-update and delete events we listen to
    watched: HashSet<E::Handle>,
    /// One unbounded queue per subscriber
    subscribers: Vec<mpsc::UnboundedSender<TranslatorEvent>>,
}

impl<E: DiagramEngine> DiagramTranslator<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            identities: ShapeIdentities::new(),
            records: HashMap::new(),
            order: Vec::new(),
            connectors: Vec::new(),
            connector_keys: HashSet::new(),
            watched: HashSet::new(),
            subscribers: Vec::new(),
        }
    }

    /// Listen to the translator's output bus
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TranslatorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn identities(&self) -> &ShapeIdentities<E::Handle> {
        &self.identities
    }

    pub fn record(&self, id: &ShapeId) -> Option<&ShapeRecord> {
        self.records.get(id)
    }

    /// Shape records in creation order
    pub fn shapes(&self) -> impl Iterator<Item = &ShapeRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn shape_count(&self) -> usize {
        self.records.len()
    }

    pub fn connectors(&self) -> &[ConnectorRecord] {
        &self.connectors
    }

    /// Feed one engine event through the translator
    pub fn handle_event(&mut self, event: EngineEvent<E::Handle>) {
        match event {
            EngineEvent::Add { target } => {
                self.watched.insert(target);
            }
            EngineEvent::TextUpdate { target, props } => {
                if !self.watched.contains(&target) {
                    debug!("Text update from unwatched shape {:?}", target);
                    return;
                }
                let id = match self.identities.id_of(&target) {
                    Some(id) => id.clone(),
                    None => {
                        warn!("Text update from unregistered shape {:?}", target);
                        return;
                    }
                };
                if let (Some(record), Some(text)) = (self.records.get_mut(&id), props.text_content()) {
                    record.detail = text.to_string();
                }
                self.emit(TranslatorEvent::Update(ShapeUpdate::props(id, props)));
            }
            EngineEvent::Delete { target } => {
                if self.watched.contains(&target) {
                    self.remove_shape(&target);
                }
            }
            EngineEvent::Move { target, position } => {
                let id = match self.identities.id_of(&target) {
                    Some(id) => id.clone(),
                    None => {
                        warn!("Move of unregistered shape {:?}", target);
                        return;
                    }
                };
                if let Some(record) = self.records.get_mut(&id) {
                    record.position = position;
                }
                self.emit(TranslatorEvent::Update(ShapeUpdate::moved(id, position)));
            }
            EngineEvent::Connect { start, end } => {
                let (start_id, end_id) = match (
                    self.identities.id_of(&start.shape),
                    self.identities.id_of(&end.shape),
                ) {
                    (Some(s), Some(e)) => (s.clone(), e.clone()),
                    _ => {
                        warn!("Connect between unregistered shapes {:?} -> {:?}", start.shape, end.shape);
                        return;
                    }
                };
                let param = ConnectParam::new(start_id, &start.key, end_id, &end.key);
                if self.track_connector(ConnectorRecord::from(&param)) {
                    self.emit(TranslatorEvent::Connect(param));
                }
            }
            EngineEvent::Disconnect { .. } => {
                debug!("Disconnect events are not propagated");
            }
        }
    }

    /// Create a shape unless its id is already known. Returns the new
    /// handle, or `None` for a duplicate (e.g. our own echoed `add`).
    pub fn shape_add(&mut self, mut param: ShapeAddParam, broadcast_locally: bool) -> Option<E::Handle> {
        if let Some(id) = &param.id {
            if self.identities.contains_id(id) {
                debug!("Shape {} already exists, ignoring add", id);
                return None;
            }
        }

        let id = param.id.clone().unwrap_or_else(ShapeId::generate);
        param.id = Some(id.clone());

        let handle = self.engine.shape_add(&param);
        let id = self.identities.register(handle.clone(), Some(id));
        self.watched.insert(handle.clone());
        self.records.insert(
            id.clone(),
            ShapeRecord {
                id: id.clone(),
                template_key: param.template_key.clone(),
                position: param.position,
                detail: param.props.text_content().unwrap_or_default().to_string(),
            },
        );
        self.order.push(id);

        if broadcast_locally {
            self.emit(TranslatorEvent::ShapeAdd(param));
        }
        Some(handle)
    }

    /// Apply a partial update to a known shape; unknown ids are ignored
    pub fn shape_update(&mut self, update: &ShapeUpdate) {
        let handle = match self.identities.handle_of(&update.id) {
            Some(handle) => handle.clone(),
            None => {
                debug!("Update for unknown shape {}", update.id);
                return;
            }
        };

        if let Some(record) = self.records.get_mut(&update.id) {
            if let Some(text) = update.props.as_ref().and_then(ShapeProps::text_content) {
                record.detail = text.to_string();
            }
            if let Some(position) = update.position {
                record.position = position;
            }
        }

        self.engine.shape_update(&handle, update);
    }

    /// Connect two known shapes unless the same connector already exists
    pub fn connect(&mut self, param: &ConnectParam) {
        self.connect_shapes(param, false);
    }

    /// Remove every shape. Local only.
    pub fn clear(&mut self) {
        let handles: Vec<E::Handle> = self
            .order
            .iter()
            .filter_map(|id| self.identities.handle_of(id).cloned())
            .collect();

        for handle in handles {
            self.remove_shape(&handle);
        }
    }

    /// Replace the diagram with a snapshot. New shapes and connectors are
    /// announced on the bus so peers receive them.
    pub fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<Vec<E::Handle>> {
        snapshot.validate()?;
        self.clear();

        let mut ids = Vec::with_capacity(snapshot.s.len());
        let mut handles = Vec::with_capacity(snapshot.s.len());
        for shape in &snapshot.s {
            let id = ShapeId::generate();
            let param = ShapeAddParam {
                id: Some(id.clone()),
                template_key: shape.template_key.clone(),
                position: shape.position,
                props: ShapeProps::with_text(shape.detail.clone()),
            };
            if let Some(handle) = self.shape_add(param, true) {
                handles.push(handle);
            }
            ids.push(id);
        }

        for connector in &snapshot.c {
            let (start, end) = match (ids.get(connector.s.i), ids.get(connector.e.i)) {
                (Some(start), Some(end)) => (start.clone(), end.clone()),
                _ => {
                    return Err(ChartRoomError::InvalidSnapshot(
                        "connector index out of range".to_string(),
                    ))
                }
            };
            let param = ConnectParam::new(start, &connector.s.c, end, &connector.e.c);
            self.connect_shapes(&param, true);
        }

        Ok(handles)
    }

    /// The current diagram in index-based snapshot form
    pub fn export_snapshot(&self) -> Snapshot {
        let index: HashMap<&ShapeId, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();

        let s = self
            .shapes()
            .map(|record| SnapshotShape {
                template_key: record.template_key.clone(),
                position: record.position,
                detail: record.detail.clone(),
            })
            .collect();

        let c = self
            .connectors
            .iter()
            .filter_map(|connector| {
                Some(SnapshotConnector {
                    s: SnapshotPort {
                        i: *index.get(&connector.start.shape_id)?,
                        c: connector.start.port_key.clone(),
                    },
                    e: SnapshotPort {
                        i: *index.get(&connector.end.shape_id)?,
                        c: connector.end.port_key.clone(),
                    },
                })
            })
            .collect();

        Snapshot { s, c }
    }

    fn connect_shapes(&mut self, param: &ConnectParam, broadcast_locally: bool) -> bool {
        let (start, end) = match (
            self.identities.handle_of(&param.s.i),
            self.identities.handle_of(&param.e.i),
        ) {
            (Some(start), Some(end)) => (start.clone(), end.clone()),
            _ => {
                debug!("Connect references unknown shape {} or {}", param.s.i, param.e.i);
                return false;
            }
        };

        if !self.track_connector(ConnectorRecord::from(param)) {
            debug!("Connector {} -> {} already exists", param.s.i, param.e.i);
            return false;
        }

        self.engine.shape_connect(
            &EnginePort::new(start, param.s.c.clone()),
            &EnginePort::new(end, param.e.c.clone()),
        );

        if broadcast_locally {
            self.emit(TranslatorEvent::Connect(param.clone()));
        }
        true
    }

    // Returns false when an equal connector is already tracked
    fn track_connector(&mut self, record: ConnectorRecord) -> bool {
        if self.connector_keys.insert(record.key()) {
            self.connectors.push(record);
            true
        } else {
            false
        }
    }

    fn remove_shape(&mut self, handle: &E::Handle) {
        self.engine.shape_del(handle);
        self.watched.remove(handle);

        if let Some(id) = self.identities.unregister(handle) {
            self.records.remove(&id);
            self.order.retain(|known| *known != id);
            self.connectors.retain(|c| !c.touches(&id));
            self.connector_keys
                .retain(|(a, b)| a.shape_id != id && b.shape_id != id);
        }
    }

    fn emit(&mut self, event: TranslatorEvent) {
        self.subscribers.retain(|tx| !tx.is_closed());
        if self.subscribers.is_empty() {
            debug!("No subscribers for translator event");
            return;
        }
        for tx in &self.subscribers {
            if tx.send(event.clone()).is_err() {
                debug!("Translator subscriber went away");
            }
        }
    }
}

impl<E: DiagramEngine> OperationSink for DiagramTranslator<E> {
    fn apply(&mut self, message: WireMessage) {
        match message {
            WireMessage::Add(param) => {
                self.shape_add(param, false);
            }
            WireMessage::Update(update) => self.shape_update(&update),
            WireMessage::Connect(param) => self.connect(&param),
        }
    }
}
