//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: UUID-based identifier of a live connection
//! - `RoomCode`: 5-character uppercase alphanumeric room code

use serde::Serialize;
use uuid::Uuid;

/// Length of a generated room code
pub const ROOM_CODE_LEN: usize = 5;

/// Alphabet room codes are drawn from
const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Unique connection identifier (newtype pattern)
///
/// Assigned by the transport when a socket is accepted and
/// dropped when it closes. Never reused for another connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room code (5-character uppercase alphanumeric)
///
/// Always stored upper-case, so lookups are case-insensitive once
/// user input goes through [`RoomCode::from_string`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Generate a new random room code
    ///
    /// Uniqueness is the caller's concern; see `RoomRegistry::create_room`.
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_CHARSET[rng.gen_range(0..ROOM_CODE_CHARSET.len())] as char)
            .collect();
        Self(code)
    }

    /// Create a RoomCode from user input (trimmed, converted to uppercase)
    pub fn from_string(code: &str) -> Self {
        Self(code.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_room_code_shape() {
        for _ in 0..200 {
            let code = RoomCode::generate();
            assert_eq!(code.0.len(), ROOM_CODE_LEN);
            assert!(code
                .0
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_room_code_uppercase() {
        let code = RoomCode::from_string(" q7x2p ");
        assert_eq!(code.as_str(), "Q7X2P");
    }

    #[test]
    fn test_room_code_serializes_as_string() {
        let json = serde_json::to_string(&RoomCode::from_string("ab12c")).unwrap();
        assert_eq!(json, "\"AB12C\"");
    }
}
