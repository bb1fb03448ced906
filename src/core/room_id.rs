//! 256-bit room identities
//!
//! A room is addressed either by a random identity (private rooms, handed
//! out by `POST /api/chart`) or by a short public name from which an
//! identity is derived deterministically.

use std::fmt;

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::constants::{MAX_ROOM_NAME_LEN, ROOM_ID_BYTES};
use crate::error::{ChartRoomError, Result};

/// Domain separator so derived identities never collide with another hash use
const NAME_NAMESPACE: &[u8] = b"chartroom/room-name/v1:";

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId([u8; ROOM_ID_BYTES]);

impl RoomId {
    /// Generate a fresh, unguessable identity
    pub fn new_unique() -> Self {
        let mut bytes = [0u8; ROOM_ID_BYTES];
        rand::thread_rng().fill(&mut bytes[..]);
        Self(bytes)
    }

    /// Parse the 64 lowercase hex digit text form
    pub fn from_hex(text: &str) -> Result<Self> {
        if !is_hex_id(text) {
            return Err(ChartRoomError::InvalidRoomId(text.to_string()));
        }

        let mut bytes = [0u8; ROOM_ID_BYTES];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&text[i * 2..i * 2 + 2], 16)
                .map_err(|_| ChartRoomError::InvalidRoomId(text.to_string()))?;
        }
        Ok(Self(bytes))
    }

    /// Derive an identity from a room name. The same name always maps to
    /// the same identity.
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(NAME_NAMESPACE);
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; ROOM_ID_BYTES];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Resolve the `{name}` path segment of `/api/chart/{name}/...`
    pub fn resolve(name: &str) -> Result<Self> {
        if is_hex_id(name) {
            Self::from_hex(name)
        } else if name.len() <= MAX_ROOM_NAME_LEN {
            Ok(Self::from_name(name))
        } else {
            Err(ChartRoomError::RoomNameTooLong(name.len()))
        }
    }
}

/// Exactly 64 lowercase hex digits
pub fn is_hex_id(text: &str) -> bool {
    text.len() == ROOM_ID_BYTES * 2
        && text.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomId({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_are_lowercase_hex() {
        let id = RoomId::new_unique().to_string();
        assert_eq!(id.len(), 64);
        assert!(is_hex_id(&id));
    }

    #[test]
    fn test_unique_ids_differ() {
        assert_ne!(RoomId::new_unique(), RoomId::new_unique());
    }

    #[test]
    fn test_hex_text_parses_back() {
        let id = RoomId::new_unique();
        assert_eq!(RoomId::from_hex(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_name_derivation_is_deterministic() {
        let first = RoomId::resolve("team-standup").unwrap();
        let second = RoomId::resolve("team-standup").unwrap();
        assert_eq!(first, second);
        assert_ne!(first, RoomId::resolve("team-standdown").unwrap());
    }

    #[test]
    fn test_hex_name_is_taken_literally() {
        let text = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        let id = RoomId::resolve(text).unwrap();
        assert_eq!(id.to_string(), text);
    }

    #[test]
    fn test_name_length_boundary() {
        let name_32 = "a".repeat(32);
        let name_33 = "b".repeat(33);
        assert!(RoomId::resolve(&name_32).is_ok());
        assert!(matches!(
            RoomId::resolve(&name_33),
            Err(ChartRoomError::RoomNameTooLong(33))
        ));
    }

    #[test]
    fn test_uppercase_hex_is_too_long_name() {
        let text = "0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF";
        assert!(matches!(
            RoomId::resolve(text),
            Err(ChartRoomError::RoomNameTooLong(64))
        ));
    }

    #[test]
    fn test_from_hex_rejects_short_text() {
        assert!(RoomId::from_hex("abc").is_err());
    }
}
