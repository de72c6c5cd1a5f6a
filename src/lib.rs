//! Line-based 1:1 Chat Server Library
//!
//! A TCP chat service where each connection claims a nickname, pairs with
//! one other user, and exchanges free-text lines. Clients learn whether a
//! requested change succeeded through confirmation receipts.
//!
//! # Features
//! - Per-connection, changeable line terminator (`/delimit`)
//! - Server-wide unique nicknames (`/nick`)
//! - Symmetric 1:1 pairing and unpairing (`/msg <name>`, `/msg Listener`)
//! - Confirmation receipts (`OK\u{1}nick\u{1}Alice\u{2}SERVER: ...`)
//! - Disconnect handling that always notifies the remaining partner
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Server` is the central actor owning sessions, registry and pairing
//! - Each connection has a `handler` task that reads frames and waits for
//!   the actor to process each one before reading the next
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use pair_chat::{accept_loop, ConnectionLimits, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:5010").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(Server::new(cmd_rx).run());
//!     accept_loop(listener, cmd_tx, ConnectionLimits::default()).await;
//! }
//! ```

pub mod actions;
pub mod client;
pub mod config;
pub mod error;
pub mod framing;
pub mod handler;
pub mod message;
pub mod pairing;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use actions::{ActionDispatcher, Handler};
pub use client::{ClientEvent, ClientState, PendingChange};
pub use config::{ClientConfig, ConnectionLimits, ServerConfig};
pub use error::{AppError, SendError};
pub use framing::LineReader;
pub use handler::{accept_loop, handle_connection};
pub use message::{ControlMessage, Inbound, Receipt, Status};
pub use registry::UserRegistry;
pub use server::{LineOutcome, Server, ServerCommand, ServerState};
pub use session::Session;
pub use types::SessionId;
