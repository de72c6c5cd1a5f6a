//! Session struct definition
//!
//! Represents one live connection as seen by the server actor: nickname,
//! connection-local terminator, current correspondent and outbound channel.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::SendError;
use crate::types::{guest_name, SessionId, DEFAULT_TERMINATOR, END_OF_HEADER};

/// Connected session information
///
/// The correspondent is held by id only; a session never owns its partner.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this session
    pub id: SessionId,
    /// Remote address of the connection
    pub peer: SocketAddr,
    /// Display name; a guest name until `/nick` succeeds
    pub nickname: String,
    /// Terminator used for frames in both directions on this connection
    pub terminator: String,
    /// Paired session, if any
    pub correspondent: Option<SessionId>,
    /// False once the session has been disconnected
    pub active: bool,
    /// Server → connection channel of already framed lines
    sender: mpsc::Sender<String>,
}

impl Session {
    /// Create a new session with a guest name and the default terminator
    pub fn new(id: SessionId, peer: SocketAddr, sender: mpsc::Sender<String>) -> Self {
        Self {
            id,
            peer,
            nickname: guest_name(&peer),
            terminator: DEFAULT_TERMINATOR.to_string(),
            correspondent: None,
            active: true,
            sender,
        }
    }

    /// Queue a line framed with this session's own terminator
    pub fn write(&self, line: &str) -> Result<(), SendError> {
        self.write_with(line, &self.terminator)
    }

    /// Queue a line framed with an explicit terminator
    ///
    /// Used to answer a request with the terminator that was in effect
    /// when the request was read.
    pub fn write_with(&self, line: &str, terminator: &str) -> Result<(), SendError> {
        debug!(session = %self.id, "TO {}: {:?}", self.nickname, line);
        self.sender
            .try_send(frame(line, terminator))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
            })
    }

    pub fn is_paired(&self) -> bool {
        self.correspondent.is_some()
    }
}

/// Append the terminator, blanking any copy of it inside the text
///
/// A receiver splits on the first terminator it sees, so the text must
/// never contain it. Only the body of a receipt is blanked; its header
/// carries tags the client matches exactly.
pub fn frame(line: &str, terminator: &str) -> String {
    if terminator.is_empty() {
        return line.to_string();
    }
    let mut framed = match line.split_once(END_OF_HEADER) {
        Some((header, body)) => {
            format!("{}{}{}", header, END_OF_HEADER, body.replace(terminator, " "))
        }
        None => line.replace(terminator, " "),
    };
    framed.push_str(terminator);
    framed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_session_creation() {
        let (tx, _rx) = mpsc::channel(8);
        let session = Session::new(SessionId::new(), peer(), tx);

        assert_eq!(session.nickname, "GUEST/127.0.0.1");
        assert_eq!(session.terminator, "\n");
        assert!(session.active);
        assert!(!session.is_paired());
    }

    #[tokio::test]
    async fn test_write_uses_own_terminator() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = Session::new(SessionId::new(), peer(), tx);

        session.write("one").unwrap();
        session.terminator = "END".to_string();
        session.write("two").unwrap();
        session.write_with("three", "\n").unwrap();

        assert_eq!(rx.recv().await.unwrap(), "one\n");
        assert_eq!(rx.recv().await.unwrap(), "twoEND");
        assert_eq!(rx.recv().await.unwrap(), "three\n");
    }

    #[test]
    fn test_frame_blanks_embedded_terminator() {
        assert_eq!(frame("a;;b", ";;"), "a b;;");
        assert_eq!(frame("line", "\n"), "line\n");
    }

    #[test]
    fn test_frame_keeps_receipt_header() {
        assert_eq!(
            frame("OK\u{1}nick\u{1}Bo\u{2}SERVER: done", "n"),
            "OK\u{1}nick\u{1}Bo\u{2}SERVER: do en"
        );
    }

    #[tokio::test]
    async fn test_write_reports_full_and_closed() {
        let (tx, rx) = mpsc::channel(1);
        let session = Session::new(SessionId::new(), peer(), tx);

        session.write("first").unwrap();
        assert!(matches!(session.write("second"), Err(SendError::QueueFull)));

        drop(rx);
        assert!(matches!(session.write("third"), Err(SendError::ChannelClosed)));
    }
}
