//! TCP connection handler
//!
//! Handles individual connections: frame reading with the session's
//! current terminator, the round trip to the Server actor, and the writer
//! task that owns the socket's write half.

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::ConnectionLimits;
use crate::error::AppError;
use crate::framing::LineReader;
use crate::server::{LineOutcome, ServerCommand};
use crate::types::{SessionId, DEFAULT_TERMINATOR};

/// Accept connections forever, spawning one task per connection
pub async fn accept_loop(
    listener: TcpListener,
    cmd_tx: mpsc::Sender<ServerCommand>,
    limits: ConnectionLimits,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, limits).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle a new TCP connection
///
/// Registers a session with the Server actor, then reads one frame at a
/// time until end of stream, a transport error, or the session quits.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    limits: ConnectionLimits,
) -> Result<(), AppError> {
    let peer = stream.peer_addr()?;
    let session_id = SessionId::new();
    let (read_half, write_half) = stream.into_split();

    // Channel for server -> connection lines, already framed
    let (line_tx, line_rx) = mpsc::channel::<String>(limits.outbound_buffer);

    if cmd_tx
        .send(ServerCommand::Connect {
            session_id,
            peer,
            sender: line_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register session {} - server closed", session_id);
        return Err(AppError::ChannelSend);
    }
    info!(session = %session_id, "Session connected from {}", peer);

    let mut write_task = tokio::spawn(write_lines(write_half, line_rx));
    let mut writer_done = false;

    let mut reader = LineReader::new(read_half, limits.max_line_bytes);
    let mut terminator = DEFAULT_TERMINATOR.to_string();

    loop {
        tokio::select! {
            read = reader.read_line(&terminator) => match read {
                Ok(Some(line)) => {
                    let Some(outcome) = submit_line(&cmd_tx, session_id, line).await else {
                        debug!("Server closed, ending session {}", session_id);
                        break;
                    };
                    // Next frame is read with whatever the line left in effect
                    terminator = outcome.terminator;
                    if !outcome.keep_open {
                        break;
                    }
                }
                Ok(None) => {
                    debug!(session = %session_id, "End of stream");
                    break;
                }
                Err(e) => {
                    warn!(session = %session_id, "Read failed: {}", e);
                    break;
                }
            },
            _ = &mut write_task => {
                writer_done = true;
                debug!(session = %session_id, "Writer ended");
                break;
            }
        }
    }

    // Server drops the session's sender, which lets the writer drain and close
    let _ = cmd_tx.send(ServerCommand::Disconnect { session_id }).await;
    if !writer_done {
        let _ = write_task.await;
    }

    info!(session = %session_id, "Session disconnected");

    Ok(())
}

/// Send one frame to the Server actor and wait for it to be processed
async fn submit_line(
    cmd_tx: &mpsc::Sender<ServerCommand>,
    session_id: SessionId,
    line: String,
) -> Option<LineOutcome> {
    let (reply_tx, reply_rx) = oneshot::channel();
    cmd_tx
        .send(ServerCommand::Line {
            session_id,
            line,
            reply: reply_tx,
        })
        .await
        .ok()?;
    reply_rx.await.ok()
}

/// Drain framed lines into the socket until the server drops the sender
async fn write_lines(mut writer: OwnedWriteHalf, mut lines: mpsc::Receiver<String>) {
    while let Some(frame) = lines.recv().await {
        if let Err(e) = writer.write_all(frame.as_bytes()).await {
            debug!("Socket write failed, ending write task: {}", e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}
