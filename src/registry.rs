//! Nickname registry
//!
//! Server-wide mapping from nickname to session. Knows nothing about
//! pairing; the server actor keeps both consistent.

use std::collections::HashMap;

use crate::error::AppError;
use crate::types::{SessionId, LISTENER};

/// Nickname → session mapping with unique keys
///
/// The reserved name "Listener" is never stored.
#[derive(Debug, Default)]
pub struct UserRegistry {
    names: HashMap<String, SessionId>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a nickname for a session
    ///
    /// Fails if the name is reserved or held by any session, including
    /// the caller.
    pub fn register(&mut self, name: &str, session_id: SessionId) -> Result<(), AppError> {
        if name == LISTENER {
            return Err(AppError::NameReserved(name.to_string()));
        }
        if self.names.contains_key(name) {
            return Err(AppError::NameTaken(name.to_string()));
        }
        self.names.insert(name.to_string(), session_id);
        Ok(())
    }

    /// Release a nickname held by the given session
    ///
    /// No-op if the name is absent or belongs to another session (a guest
    /// name can collide with a name someone else registered).
    pub fn unregister(&mut self, name: &str, session_id: SessionId) -> bool {
        if self.lookup(name) == Some(session_id) {
            self.names.remove(name);
            true
        } else {
            false
        }
    }

    pub fn lookup(&self, name: &str) -> Option<SessionId> {
        self.names.get(name).copied()
    }

    /// True if the session holds this exact name
    pub fn is_registered(&self, name: &str, session_id: SessionId) -> bool {
        self.lookup(name) == Some(session_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
