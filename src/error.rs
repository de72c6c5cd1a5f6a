//! Error types for the chat server
//!
//! Defines application-level errors and outbound send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (session termination) and state conflicts
/// that are answered on the wire while the session stays open.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Peer sent more bytes than allowed without a terminator (fatal)
    #[error("Line exceeds {0} bytes without a terminator")]
    LineTooLong(usize),

    /// Received line has a header marker but no valid status
    #[error("Malformed receipt: {0}")]
    MalformedReceipt(String),

    /// Name is reserved and can never be registered
    #[error("'{0}' is a reserved name")]
    NameReserved(String),

    /// Name is already registered by another session
    #[error("{0} already in use")]
    NameTaken(String),

    /// A session cannot be paired with itself
    #[error("Cannot pair a session with itself")]
    SelfPairing,

    /// One side of a requested link already has a correspondent
    #[error("Session is already paired")]
    AlreadyPaired,

    /// Session has no correspondent
    #[error("Session is not paired")]
    NotPaired,

    /// No live session with the given id
    #[error("Session not found")]
    SessionNotFound,
}

/// Message send errors
///
/// Occurs when queuing a line for a session whose writer is gone or behind.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The outbound queue is full
    #[error("Outbound queue full")]
    QueueFull,
}
