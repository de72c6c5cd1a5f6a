//! Server actor implementation
//!
//! The central actor that owns all shared state: sessions, the nickname
//! registry and the correspondent links. Connection tasks talk to it over
//! an mpsc channel, and each command runs to completion before the next,
//! so multi-step transitions (drop old pair, form new pair, notify three
//! parties) are never observed half-done.

use std::net::SocketAddr;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::actions::ActionDispatcher;
use crate::pairing::{self, SessionMap, UnlinkReason};
use crate::registry::UserRegistry;
use crate::session::Session;
use crate::types::{has_reserved_bytes, SessionId, CONTROL_MARKER, DEFAULT_TERMINATOR};

/// Commands sent from connection tasks to the Server actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection accepted
    Connect {
        session_id: SessionId,
        peer: SocketAddr,
        sender: mpsc::Sender<String>,
    },
    /// One frame read from the connection
    Line {
        session_id: SessionId,
        line: String,
        reply: oneshot::Sender<LineOutcome>,
    },
    /// Connection ended (EOF, transport error or after quit)
    Disconnect { session_id: SessionId },
}

/// What the connection task needs to know before reading the next frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOutcome {
    /// Terminator to use for the next read
    pub terminator: String,
    /// False once the session has been disconnected
    pub keep_open: bool,
}

impl LineOutcome {
    fn closed() -> Self {
        Self {
            terminator: DEFAULT_TERMINATOR.to_string(),
            keep_open: false,
        }
    }
}

/// Shared mutable state, only ever touched from the actor task
///
/// Handed to action handlers so they can mutate registry and pairing.
#[derive(Debug, Default)]
pub struct ServerState {
    pub sessions: SessionMap,
    pub registry: UserRegistry,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    /// Tear down a session's shared state; safe to call more than once
    ///
    /// Marks it inactive, unlinks (notifying the partner) and releases its
    /// nickname. The session stays in the map so a final reply can still be
    /// queued; `remove` closes its outbound stream.
    pub fn disconnect(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        if !session.active {
            return;
        }
        session.active = false;
        let paired = session.is_paired();
        let nickname = session.nickname.clone();

        if paired {
            if let Err(e) = pairing::unlink(&mut self.sessions, id, UnlinkReason::Disconnected) {
                warn!(session = %id, "Unlink on disconnect failed: {}", e);
            }
        }
        if self.registry.unregister(&nickname, id) {
            debug!(session = %id, "Released nickname '{}'", nickname);
        }
    }

    /// Drop a session, closing its outbound channel
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }
}

/// The main Server actor
///
/// Owns the state and the action dispatcher; processes commands from
/// connection tasks until every sender is dropped.
pub struct Server {
    state: ServerState,
    dispatcher: ActionDispatcher,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl Server {
    /// Create a Server with the built-in actions
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self::with_dispatcher(receiver, ActionDispatcher::with_builtins())
    }

    /// Create a Server with a custom action table
    pub fn with_dispatcher(
        receiver: mpsc::Receiver<ServerCommand>,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            state: ServerState::new(),
            dispatcher,
            receiver,
        }
    }

    /// Run the Server event loop
    pub async fn run(mut self) {
        info!("Server actor started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Server actor shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect {
                session_id,
                peer,
                sender,
            } => {
                self.handle_connect(session_id, peer, sender);
            }
            ServerCommand::Line {
                session_id,
                line,
                reply,
            } => {
                let outcome = self.handle_line(session_id, &line);
                // Connection task may already be gone
                let _ = reply.send(outcome);
            }
            ServerCommand::Disconnect { session_id } => {
                self.handle_disconnect(session_id);
            }
        }
    }

    /// Handle new connection
    fn handle_connect(&mut self, id: SessionId, peer: SocketAddr, sender: mpsc::Sender<String>) {
        info!(session = %id, "CONNECT: {}", peer);
        self.state.insert(Session::new(id, peer, sender));
        self.log_totals();
    }

    /// Handle one inbound frame
    fn handle_line(&mut self, id: SessionId, line: &str) -> LineOutcome {
        let Some(session) = self.state.session(id) else {
            return LineOutcome::closed();
        };
        debug!(session = %id, "FROM {}: {:?}", session.nickname, line);

        // The answer to a request uses the terminator it was sent with
        let reply_terminator = session.terminator.clone();

        let response = if line.is_empty() {
            None
        } else if line.starts_with(CONTROL_MARKER) {
            Some(self.dispatcher.dispatch(line, &mut self.state, id))
        } else {
            self.forward(id, line)
        };

        let Some(session) = self.state.session(id) else {
            return LineOutcome::closed();
        };
        if let Some(response) = response {
            if let Err(e) = session.write_with(&response, &reply_terminator) {
                warn!(session = %id, "Dropped reply: {}", e);
            }
        }

        let outcome = LineOutcome {
            terminator: session.terminator.clone(),
            keep_open: session.active,
        };
        if !outcome.keep_open {
            self.state.remove(id);
            self.log_totals();
        }
        outcome
    }

    /// Relay plain text to the correspondent
    ///
    /// Returns a line for the sender when the text could not be relayed.
    fn forward(&self, id: SessionId, text: &str) -> Option<String> {
        if has_reserved_bytes(text) {
            return Some("SERVER: Messages may not contain reserved characters.".to_string());
        }

        let session = self.state.session(id)?;
        let Some(partner_id) = session.correspondent else {
            return Some("SERVER: You are not chatting with anyone.".to_string());
        };

        let relayed = format!("{}: {}", session.nickname, text);
        if let Some(partner) = self.state.session(partner_id) {
            if let Err(e) = partner.write(&relayed) {
                warn!(session = %partner_id, "Dropped chat line: {}", e);
            }
        }
        None
    }

    /// Handle connection end
    fn handle_disconnect(&mut self, id: SessionId) {
        self.state.disconnect(id);
        if let Some(session) = self.state.remove(id) {
            info!(session = %id, "DISCONNECT: {} @ {}", session.nickname, session.peer);
            self.log_totals();
        }
    }

    fn log_totals(&self) {
        debug!(
            "Total sessions: {}, Named: {}, Paired: {}",
            self.state.sessions.len(),
            self.state.registry.len(),
            self.paired_count()
        );
    }

    fn paired_count(&self) -> usize {
        self.state
            .sessions
            .values()
            .filter(|s| s.is_paired())
            .count()
    }
}
