//! Control-message dispatch
//!
//! Maps a control verb to a handler. Built-in verbs: `nick`, `msg`,
//! `delimit`, `quit`. Handlers run inside the server actor, so every
//! registry and pairing change they make is atomic with respect to other
//! connections.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::AppError;
use crate::message::{ControlMessage, Receipt, Status};
use crate::pairing::{self, UnlinkReason, LISTEN_TAG};
use crate::server::ServerState;
use crate::types::{has_reserved_bytes, SessionId, CONTROL_MARKER, LISTENER};

pub const NICK: &str = "nick";
pub const MSG: &str = "msg";
pub const DELIMIT: &str = "delimit";
pub const QUIT: &str = "quit";

/// Action handler: parsed message, shared state, requesting session → reply line
///
/// `Err` is reported to the requester as a plain `SERVER:` line.
pub type Handler = fn(&ControlMessage<'_>, &mut ServerState, SessionId) -> Result<String, AppError>;

/// Verb → handler table
pub struct ActionDispatcher {
    actions: HashMap<String, Handler>,
}

impl ActionDispatcher {
    /// Empty table; every verb is unrecognized
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Table with `nick`, `msg`, `delimit` and `quit`
    pub fn with_builtins() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(NICK, nick);
        dispatcher.register(MSG, msg);
        dispatcher.register(DELIMIT, delimit);
        dispatcher.register(QUIT, quit);
        dispatcher
    }

    /// Add or replace the handler for a verb
    pub fn register(&mut self, verb: &str, handler: Handler) {
        self.actions.insert(verb.to_string(), handler);
    }

    pub fn contains(&self, verb: &str) -> bool {
        self.actions.contains_key(verb)
    }

    /// Run the handler for a control line and return the reply line
    pub fn dispatch(&self, raw: &str, state: &mut ServerState, session_id: SessionId) -> String {
        let Some(message) = ControlMessage::parse(raw) else {
            return format!("Control message \"{}\" was not recognized.", raw);
        };

        let Some(handler) = self.actions.get(message.verb) else {
            return format!("Control message \"{}\" was not recognized.", message.verb);
        };

        handler(&message, state, session_id).unwrap_or_else(|e| {
            warn!(session = %session_id, verb = message.verb, "Action failed: {}", e);
            format!("SERVER: {}.", e)
        })
    }
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// `/nick <name>`: claim a nickname, releasing the previous one
fn nick(
    message: &ControlMessage<'_>,
    state: &mut ServerState,
    session_id: SessionId,
) -> Result<String, AppError> {
    let Some(new_name) = message.trailing() else {
        return Ok(Receipt::no(
            NICK,
            "SERVER: Invalid use of /nick. Please specify a new name.",
        )
        .encode());
    };
    if has_reserved_bytes(new_name) {
        return Ok(Receipt::no(NICK, "SERVER: Names may not contain reserved characters.").encode());
    }

    let old_name = state
        .session(session_id)
        .ok_or(AppError::SessionNotFound)?
        .nickname
        .clone();

    match state.registry.register(new_name, session_id) {
        Ok(()) => {}
        Err(e @ (AppError::NameReserved(_) | AppError::NameTaken(_))) => {
            return Ok(Receipt::no(NICK, format!("SERVER: {}.", e)).encode());
        }
        Err(e) => return Err(e),
    }
    if old_name != new_name {
        state.registry.unregister(&old_name, session_id);
    }

    if let Some(session) = state.session_mut(session_id) {
        session.nickname = new_name.to_string();
    }
    info!(session = %session_id, "'{}' is now known as '{}'", old_name, new_name);

    Ok(Receipt::ok(NICK, format!("SERVER: Name successfully set to {}", new_name))
        .with_echo(new_name)
        .encode())
}

/// `/msg <target>`: pair with a listener, or `/msg Listener` to unpair
fn msg(
    message: &ControlMessage<'_>,
    state: &mut ServerState,
    session_id: SessionId,
) -> Result<String, AppError> {
    let Some(target_name) = message.trailing() else {
        return Ok(
            "SERVER: Invalid use of /msg. Please specify a target user or 'Listener.'".to_string(),
        );
    };

    let session = state.session(session_id).ok_or(AppError::SessionNotFound)?;
    if !state.registry.is_registered(&session.nickname, session_id) {
        return Ok(
            "SERVER: You are not a named user. Use /nick to set your name before chatting."
                .to_string(),
        );
    }
    let requester_name = session.nickname.clone();
    let current = session.correspondent;

    if target_name == LISTENER {
        if current.is_none() {
            return Ok(Receipt::no(LISTEN_TAG, "SERVER: You are already a listener.").encode());
        }
        pairing::unlink(&mut state.sessions, session_id, UnlinkReason::Listening)?;
        return Ok(Receipt::ok(LISTEN_TAG, "SERVER: Ended chat and now listening.").encode());
    }

    let Some(target_id) = state.registry.lookup(target_name) else {
        return Ok(format!("SERVER: User \"{}\" is not online.", target_name));
    };
    if target_id == session_id {
        return Ok("SERVER: You cannot chat with yourself.".to_string());
    }

    let target = state.session(target_id).ok_or(AppError::SessionNotFound)?;
    match target.correspondent {
        Some(partner) if partner == session_id => {
            return Ok(format!("SERVER: You are already chatting with {}", target_name));
        }
        Some(_) => {
            return Ok(format!("SERVER: User \"{}\" is already in a chat.", target_name));
        }
        None => {}
    }

    if current.is_some() {
        pairing::unlink(&mut state.sessions, session_id, UnlinkReason::Switching)?;
    }
    pairing::link(&mut state.sessions, session_id, target_id)?;

    if let Some(target) = state.session(target_id) {
        let notice = Receipt::ok(MSG, format!("SERVER: Now chatting with {}", requester_name));
        if let Err(e) = target.write(&notice.encode()) {
            warn!(session = %target_id, "Failed to notify chat target: {}", e);
        }
    }

    Ok(Receipt::ok(MSG, format!("SERVER: Now chatting with {}", target_name)).encode())
}

/// `/delimit <text>`: change this session's terminator
///
/// Takes effect for frames read after this one; the reply itself is framed
/// with the old terminator by the caller.
fn delimit(
    message: &ControlMessage<'_>,
    state: &mut ServerState,
    session_id: SessionId,
) -> Result<String, AppError> {
    let Some(terminator) = message.trailing() else {
        return Ok(Receipt::no(DELIMIT, "SERVER: No delimiter specified!").encode());
    };
    if has_reserved_bytes(terminator) {
        return Ok(
            Receipt::no(DELIMIT, "SERVER: Delimiters may not contain reserved characters.").encode(),
        );
    }
    if overlaps_keywords(terminator) {
        return Ok(
            Receipt::no(DELIMIT, "SERVER: Delimiters may not overlap protocol keywords.").encode(),
        );
    }

    let session = state
        .session_mut(session_id)
        .ok_or(AppError::SessionNotFound)?;
    session.terminator = terminator.to_string();
    info!(session = %session_id, "Terminator changed to {:?}", terminator);

    Ok(Receipt::ok(DELIMIT, "SERVER: Delimiter changed.").encode())
}

/// True if the terminator would split a receipt header or a control verb
fn overlaps_keywords(terminator: &str) -> bool {
    let headers = [Status::Ok.as_str(), Status::No.as_str(), LISTEN_TAG];
    let verbs = [NICK, MSG, DELIMIT, QUIT];
    headers.iter().any(|word| word.contains(terminator))
        || verbs
            .iter()
            .any(|verb| format!("{}{} ", CONTROL_MARKER, verb).contains(terminator))
}

/// `/quit [farewell]`: disconnect this session
fn quit(
    message: &ControlMessage<'_>,
    state: &mut ServerState,
    session_id: SessionId,
) -> Result<String, AppError> {
    let name = state
        .session(session_id)
        .ok_or(AppError::SessionNotFound)?
        .nickname
        .clone();

    state.disconnect(session_id);

    let body = match message.trailing() {
        Some(farewell) => format!("User {} has quit with message \"{}\"", name, farewell),
        None => format!("User {} has quit.", name),
    };
    Ok(Receipt::ok(QUIT, body).encode())
}
