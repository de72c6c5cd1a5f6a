//! Client-side protocol state
//!
//! Tracks the changes a client has requested and commits or discards them
//! as matching receipts arrive. Rendering and I/O live in the client binary.

use std::collections::HashMap;

use crate::actions::{DELIMIT, MSG, NICK, QUIT};
use crate::message::{self, ControlMessage, Inbound, Receipt};
use crate::pairing::LISTEN_TAG;
use crate::types::DEFAULT_TERMINATOR;

/// Name shown for local echo before the server confirms a nickname
pub const DEFAULT_USERNAME: &str = "UNNAMED_GUEST";

/// A request awaiting server confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange {
    /// Requested nickname
    Nick(String),
    /// Requested terminator
    Delimit(String),
    /// Open to a new conversation (listening, or a `/msg` in flight)
    Chat,
}

impl PendingChange {
    /// Receipt tag that resolves this change
    pub fn tag(&self) -> &'static str {
        match self {
            PendingChange::Nick(_) => NICK,
            PendingChange::Delimit(_) => DELIMIT,
            PendingChange::Chat => MSG,
        }
    }
}

/// A line ready to be written to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    /// Bytes to send, terminator included
    pub frame: String,
    /// Text to show locally for plain chat
    pub local_echo: Option<String>,
}

/// What the client should do with a received line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Show the text
    Display(String),
    /// A conversation started: clear the view, then show the text
    NewConversation(String),
    /// The server confirmed our quit: show the text and close
    Closed(String),
}

/// Client protocol state
///
/// The server switches terminators as soon as it reads a `/delimit`, but
/// answers that request with the old one. Sending therefore switches at
/// request time and receiving switches when the `OK delimit` arrives.
#[derive(Debug)]
pub struct ClientState {
    username: String,
    send_terminator: String,
    receive_terminator: String,
    pending: HashMap<&'static str, PendingChange>,
}

impl ClientState {
    /// Fresh client: unnamed, default terminator, listening
    pub fn new() -> Self {
        let mut pending = HashMap::new();
        pending.insert(MSG, PendingChange::Chat);
        Self {
            username: DEFAULT_USERNAME.to_string(),
            send_terminator: DEFAULT_TERMINATOR.to_string(),
            receive_terminator: DEFAULT_TERMINATOR.to_string(),
            pending,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Terminator for typed input and outgoing frames
    pub fn send_terminator(&self) -> &str {
        &self.send_terminator
    }

    /// Terminator the server frames the next received line with
    pub fn receive_terminator(&self) -> &str {
        &self.receive_terminator
    }

    pub fn pending(&self, tag: &str) -> Option<&PendingChange> {
        self.pending.get(tag)
    }

    /// Take the next complete message out of typed input
    ///
    /// Input accumulates until the send terminator appears; the text
    /// before it is one message and is removed from the buffer together
    /// with the terminator.
    pub fn take_message(&self, input: &mut String) -> Option<String> {
        let end = input.find(self.send_terminator.as_str())?;
        let message = input[..end].to_string();
        input.drain(..end + self.send_terminator.len());
        Some(message)
    }

    /// Prepare a typed message for sending
    ///
    /// Records a pending change for `/nick`, `/delimit` and `/msg`. The
    /// frame uses the terminator in effect before any change it requests,
    /// since the server cannot know the new one yet. A `/delimit` switches
    /// the send terminator for every later frame.
    pub fn prepare(&mut self, text: &str) -> Option<Outgoing> {
        if text.is_empty() {
            return None;
        }

        let frame = format!("{}{}", text, self.send_terminator);
        let local_echo = match ControlMessage::parse(text) {
            Some(control) => {
                self.track(&control);
                None
            }
            None => Some(format!("{}: {}", self.username, text)),
        };

        Some(Outgoing { frame, local_echo })
    }

    fn track(&mut self, control: &ControlMessage<'_>) {
        let Some(argument) = control.trailing() else {
            return;
        };
        let change = match control.verb {
            NICK => PendingChange::Nick(argument.to_string()),
            DELIMIT => {
                self.send_terminator = argument.to_string();
                PendingChange::Delimit(argument.to_string())
            }
            MSG => PendingChange::Chat,
            _ => return,
        };
        self.pending.insert(change.tag(), change);
    }

    /// Handle one received line (terminator already stripped)
    pub fn receive(&mut self, line: &str) -> ClientEvent {
        match message::decode(line) {
            Ok(Inbound::Plain(text)) => ClientEvent::Display(text.to_string()),
            Ok(Inbound::Receipt(receipt)) => self.apply(receipt),
            Err(_) => ClientEvent::Display(line.to_string()),
        }
    }

    fn apply(&mut self, receipt: Receipt) -> ClientEvent {
        let tag = receipt.tag().unwrap_or_default().to_string();

        if !receipt.is_ok() {
            if tag == DELIMIT {
                self.send_terminator = self.receive_terminator.clone();
            }
            self.pending.remove(tag.as_str());
            return ClientEvent::Display(receipt.body);
        }

        match tag.as_str() {
            NICK => {
                if let Some(PendingChange::Nick(name)) = self.pending.get(NICK) {
                    if receipt.value() == Some(name.as_str()) {
                        self.username = name.clone();
                        self.pending.remove(NICK);
                    }
                }
            }
            DELIMIT => {
                if let Some(PendingChange::Delimit(terminator)) = self.pending.remove(DELIMIT) {
                    self.receive_terminator = terminator;
                }
            }
            MSG => {
                if self.pending.remove(MSG).is_some() {
                    return ClientEvent::NewConversation(receipt.body);
                }
            }
            LISTEN_TAG => {
                self.pending.insert(MSG, PendingChange::Chat);
            }
            QUIT => return ClientEvent::Closed(receipt.body),
            _ => {}
        }

        ClientEvent::Display(receipt.body)
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_client_is_listening() {
        let state = ClientState::new();
        assert_eq!(state.username(), DEFAULT_USERNAME);
        assert_eq!(state.send_terminator(), "\n");
        assert_eq!(state.receive_terminator(), "\n");
        assert_eq!(state.pending(MSG), Some(&PendingChange::Chat));
    }

    #[test]
    fn test_nick_committed_only_on_matching_value() {
        let mut state = ClientState::new();
        state.prepare("/nick Alice").unwrap();

        // Stale receipt for another name leaves the change pending
        state.receive("OK\u{1}nick\u{1}Bob\u{2}SERVER: Name successfully set to Bob");
        assert_eq!(state.username(), DEFAULT_USERNAME);

        let event = state.receive("OK\u{1}nick\u{1}Alice\u{2}SERVER: Name successfully set to Alice");
        assert_eq!(
            event,
            ClientEvent::Display("SERVER: Name successfully set to Alice".to_string())
        );
        assert_eq!(state.username(), "Alice");
        assert_eq!(state.pending(NICK), None);
    }

    #[test]
    fn test_rejection_discards_pending() {
        let mut state = ClientState::new();
        state.prepare("/nick Alice").unwrap();

        state.receive("NO\u{1}nick\u{2}SERVER: Alice already in use.");

        assert_eq!(state.pending(NICK), None);
        assert_eq!(state.username(), DEFAULT_USERNAME);
    }

    #[test]
    fn test_delimit_switches_send_then_receive() {
        let mut state = ClientState::new();
        let out = state.prepare("/delimit ;;").unwrap();

        // Request goes out with the old terminator, later frames with the new one
        assert_eq!(out.frame, "/delimit ;;\n");
        assert_eq!(state.prepare("hello").unwrap().frame, "hello;;");

        // The reply to the request still arrives with the old terminator
        assert_eq!(state.receive_terminator(), "\n");
        state.receive("OK\u{1}delimit\u{2}SERVER: Delimiter changed.");
        assert_eq!(state.receive_terminator(), ";;");
        assert_eq!(state.send_terminator(), ";;");
    }

    #[test]
    fn test_rejected_delimit_restores_send_terminator() {
        let mut state = ClientState::new();
        state.prepare("/delimit nick").unwrap();
        assert_eq!(state.send_terminator(), "nick");

        state.receive("NO\u{1}delimit\u{2}SERVER: Delimiters may not overlap protocol keywords.");

        assert_eq!(state.send_terminator(), "\n");
        assert_eq!(state.receive_terminator(), "\n");
        assert_eq!(state.pending(DELIMIT), None);
    }

    #[test]
    fn test_conversation_lifecycle() {
        let mut state = ClientState::new();

        let event = state.receive("OK\u{1}msg\u{2}SERVER: Now chatting with Alice");
        assert_eq!(
            event,
            ClientEvent::NewConversation("SERVER: Now chatting with Alice".to_string())
        );
        assert_eq!(state.pending(MSG), None);

        state.receive("OK\u{1}listen\u{2}SERVER: User 'Alice' has disconnected.");
        assert_eq!(state.pending(MSG), Some(&PendingChange::Chat));
    }

    #[test]
    fn test_quit_closes() {
        let mut state = ClientState::new();
        assert_eq!(
            state.receive("OK\u{1}quit\u{2}User Alice has quit."),
            ClientEvent::Closed("User Alice has quit.".to_string())
        );
    }

    #[test]
    fn test_plain_and_malformed_lines_displayed() {
        let mut state = ClientState::new();
        assert_eq!(
            state.receive("Bob: hi"),
            ClientEvent::Display("Bob: hi".to_string())
        );
        assert_eq!(
            state.receive("??\u{2}odd"),
            ClientEvent::Display("??\u{2}odd".to_string())
        );
    }

    #[test]
    fn test_prepare_plain_echoes_locally() {
        let mut state = ClientState::new();
        let out = state.prepare("hello").unwrap();
        assert_eq!(out.frame, "hello\n");
        assert_eq!(out.local_echo.as_deref(), Some("UNNAMED_GUEST: hello"));
        assert!(state.prepare("").is_none());
    }

    #[test]
    fn test_take_message_by_terminator() {
        let mut state = ClientState::new();
        let mut input = String::from("first\nsecond");
        assert_eq!(state.take_message(&mut input).as_deref(), Some("first"));
        assert_eq!(state.take_message(&mut input), None);
        assert_eq!(input, "second");

        state.prepare("/delimit END").unwrap();
        state.receive("OK\u{1}delimit\u{2}SERVER: Delimiter changed.");
        let mut input = String::from("multi\nline END");
        assert_eq!(state.take_message(&mut input).as_deref(), Some("multi\nline "));
        assert!(input.is_empty());
    }
}
