use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Stable cross-client shape identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(pub String);

impl ShapeId {
    /// Fresh random token for a shape created without an id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShapeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextProps {
    #[serde(rename = "textContent", default)]
    pub text_content: String,
}

/// Shape properties. `text` is the only one the translator reads; the
/// rest pass through to the diagram engine untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextProps>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShapeProps {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(TextProps {
                text_content: text.into(),
            }),
            extra: Map::new(),
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.text_content.as_str())
    }
}

/// Payload of `add`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeAddParam {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ShapeId>,
    #[serde(rename = "templateKey")]
    pub template_key: String,
    pub position: Position,
    #[serde(default)]
    pub props: ShapeProps,
}

/// Payload of `update`: either `{id, props}` or `{id, position}` after a move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeUpdate {
    pub id: ShapeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<ShapeProps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShapeUpdate {
    pub fn props(id: ShapeId, props: ShapeProps) -> Self {
        Self {
            id,
            props: Some(props),
            position: None,
            extra: Map::new(),
        }
    }

    pub fn moved(id: ShapeId, position: Position) -> Self {
        Self {
            id,
            props: None,
            position: Some(position),
            extra: Map::new(),
        }
    }
}

/// One end of a connector on the wire: shape id plus port key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub i: ShapeId,
    pub c: String,
}

/// Payload of `connect`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectParam {
    pub s: PortRef,
    pub e: PortRef,
}

impl ConnectParam {
    pub fn new(start: ShapeId, start_port: &str, end: ShapeId, end_port: &str) -> Self {
        Self {
            s: PortRef {
                i: start,
                c: start_port.to_string(),
            },
            e: PortRef {
                i: end,
                c: end_port.to_string(),
            },
        }
    }
}

/// A frame on the room socket: `{"type": ..., "msg": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "msg", rename_all = "lowercase")]
pub enum WireMessage {
    Add(ShapeAddParam),
    Update(ShapeUpdate),
    Connect(ConnectParam),
}

impl WireMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Add(_) => "add",
            WireMessage::Update(_) => "update",
            WireMessage::Connect(_) => "connect",
        }
    }
}
