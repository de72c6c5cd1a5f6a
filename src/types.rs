//! Basic type definitions for the chat server
//!
//! Provides the session identifier newtype and the protocol-wide constants:
//! - `SessionId`: UUID-based unique session identifier
//! - control marker, reserved bytes, default terminator and reserved names

use std::net::SocketAddr;

use uuid::Uuid;

/// Leading character of a control line (`/nick Alice`)
pub const CONTROL_MARKER: char = '/';

/// Separates status and echo fields inside a receipt header
pub const CONTROL_DELIMITER: char = '\u{1}';

/// Ends a receipt header; everything after it is display text
pub const END_OF_HEADER: char = '\u{2}';

/// Terminator every connection starts with
pub const DEFAULT_TERMINATOR: &str = "\n";

/// Reserved target name meaning "no correspondent"
pub const LISTENER: &str = "Listener";

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4 so sessions can be referenced by identity without
/// owning each other. Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Nickname a session carries before its first successful `/nick`
pub fn guest_name(peer: &SocketAddr) -> String {
    format!("GUEST/{}", peer.ip())
}

/// True if the text contains a byte reserved for the receipt header
pub fn has_reserved_bytes(text: &str) -> bool {
    text.contains(|c: char| c == CONTROL_DELIMITER || c == END_OF_HEADER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_guest_name_uses_peer_ip() {
        let peer: SocketAddr = "10.0.0.7:40123".parse().unwrap();
        assert_eq!(guest_name(&peer), "GUEST/10.0.0.7");
    }

    #[test]
    fn test_reserved_bytes_detected() {
        assert!(has_reserved_bytes("a\u{1}b"));
        assert!(has_reserved_bytes("\u{2}"));
        assert!(!has_reserved_bytes("plain text / with slash"));
    }
}
