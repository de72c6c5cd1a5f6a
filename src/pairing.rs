//! Correspondent pairing
//!
//! Links and unlinks two sessions. The relation is always symmetric or
//! absent: if A's correspondent is B then B's correspondent is A.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::AppError;
use crate::message::Receipt;
use crate::session::Session;
use crate::types::SessionId;

/// All live sessions, keyed by id
pub type SessionMap = HashMap<SessionId, Session>;

/// Receipt tag telling a client it has become a listener
pub const LISTEN_TAG: &str = "listen";

/// Why a pair is being broken; selects the notice sent to the other side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlinkReason {
    /// Initiator asked to become a listener
    Listening,
    /// Initiator is starting a chat with someone else
    Switching,
    /// Initiator is going away
    Disconnected,
}

impl UnlinkReason {
    /// Notice for the dropped side, naming the initiator
    pub fn notice(&self, initiator: &str) -> String {
        match self {
            UnlinkReason::Listening => format!("SERVER: User '{}' has stopped chatting.", initiator),
            UnlinkReason::Switching => format!("SERVER: User \"{}\" is no longer chatting.", initiator),
            UnlinkReason::Disconnected => format!("SERVER: User '{}' has disconnected.", initiator),
        }
    }
}

/// Pair two unpaired sessions
pub fn link(sessions: &mut SessionMap, a: SessionId, b: SessionId) -> Result<(), AppError> {
    if a == b {
        return Err(AppError::SelfPairing);
    }

    for id in [a, b] {
        let session = sessions.get(&id).ok_or(AppError::SessionNotFound)?;
        if session.is_paired() {
            return Err(AppError::AlreadyPaired);
        }
    }

    // Both exist: checked above
    if let Some(session) = sessions.get_mut(&a) {
        session.correspondent = Some(b);
    }
    if let Some(session) = sessions.get_mut(&b) {
        session.correspondent = Some(a);
    }

    info!(a = %a, b = %b, "Sessions paired");
    Ok(())
}

/// Break the pair `a` belongs to and notify the other side
///
/// Returns the former correspondent.
pub fn unlink(
    sessions: &mut SessionMap,
    a: SessionId,
    reason: UnlinkReason,
) -> Result<SessionId, AppError> {
    let initiator = sessions.get_mut(&a).ok_or(AppError::SessionNotFound)?;
    let b = initiator.correspondent.take().ok_or(AppError::NotPaired)?;
    let notice = reason.notice(&initiator.nickname);

    if let Some(partner) = sessions.get_mut(&b) {
        if partner.correspondent == Some(a) {
            partner.correspondent = None;
        }
        if let Err(e) = partner.write(&Receipt::ok(LISTEN_TAG, notice).encode()) {
            warn!(session = %b, "Failed to notify dropped correspondent: {}", e);
        }
    }

    info!(a = %a, b = %b, ?reason, "Sessions unpaired");
    Ok(b)
}
