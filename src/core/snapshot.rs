//! Shareable-link snapshots
//!
//! A snapshot is the whole diagram packed into a URL fragment. Unlike the
//! live wire protocol, connectors reference shapes by their zero-based
//! index in `s`, not by [`ShapeId`](crate::core::message::ShapeId).

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::message::Position;
use crate::error::{ChartRoomError, Result};

/// Characters `encodeURIComponent` leaves alone
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotShape {
    #[serde(rename = "templateKey")]
    pub template_key: String,
    pub position: Position,
    #[serde(default)]
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPort {
    pub i: usize,
    pub c: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConnector {
    pub s: SnapshotPort,
    pub e: SnapshotPort,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub s: Vec<SnapshotShape>,
    #[serde(default)]
    pub c: Vec<SnapshotConnector>,
}

impl Snapshot {
    /// Parse the fragment of a share link, with or without the leading `#`
    pub fn from_fragment(fragment: &str) -> Result<Self> {
        let encoded = fragment.strip_prefix('#').unwrap_or(fragment);
        let json = percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|e| ChartRoomError::InvalidSnapshot(format!("fragment is not UTF-8: {}", e)))?;

        let snapshot: Snapshot = serde_json::from_str(&json)
            .map_err(|e| ChartRoomError::InvalidSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Percent-encoded JSON, ready to use as a URL fragment
    pub fn to_fragment(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(utf8_percent_encode(&json, COMPONENT).to_string())
    }

    /// `base` with this snapshot as its fragment
    pub fn share_link(&self, base: &Url) -> Result<Url> {
        let mut link = base.clone();
        link.set_fragment(Some(&self.to_fragment()?));
        Ok(link)
    }

    /// Every connector index must point into `s`
    pub fn validate(&self) -> Result<()> {
        let count = self.s.len();
        for (n, connector) in self.c.iter().enumerate() {
            for port in [&connector.s, &connector.e] {
                if port.i >= count {
                    return Err(ChartRoomError::InvalidSnapshot(format!(
                        "connector {} references shape {} but only {} shapes exist",
                        n, port.i, count
                    )));
                }
            }
        }
        Ok(())
    }
}
