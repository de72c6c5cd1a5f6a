//! Command line configuration
//!
//! Server and client options, parsed with clap. Every option has a default
//! so both binaries run with no arguments.

use clap::builder::RangedU64ValueParser;
use clap::Parser;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:5010";

/// Longest frame accepted before the connection is dropped
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Channel buffer size for server commands
pub const DEFAULT_COMMAND_BUFFER: usize = 256;

/// Per-session queue of outbound lines
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Server options
#[derive(Debug, Clone, Parser)]
#[command(name = "pair_chat", about = "Line-based 1:1 chat server", version)]
pub struct ServerConfig {
    /// Address to listen on (host:port)
    #[arg(long, env = "PAIR_CHAT_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Maximum bytes in one frame before the connection is dropped
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_BYTES)]
    pub max_line_bytes: usize,

    /// Capacity of the server command channel
    #[arg(long, default_value_t = DEFAULT_COMMAND_BUFFER, value_parser = non_zero())]
    pub command_buffer: usize,

    /// Capacity of each session's outbound queue
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_BUFFER, value_parser = non_zero())]
    pub outbound_buffer: usize,
}

/// Channel capacities must be at least one
fn non_zero() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..)
}

impl ServerConfig {
    pub fn limits(&self) -> ConnectionLimits {
        ConnectionLimits {
            max_line_bytes: self.max_line_bytes,
            outbound_buffer: self.outbound_buffer,
        }
    }
}

/// Per-connection limits handed to each connection task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    pub max_line_bytes: usize,
    pub outbound_buffer: usize,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// Client options
#[derive(Debug, Clone, Parser)]
#[command(name = "pair_chat_client", about = "Terminal client for pair_chat", version)]
pub struct ClientConfig {
    /// Server address (host:port)
    #[arg(long, env = "PAIR_CHAT_SERVER", default_value = DEFAULT_ADDR)]
    pub server: String,

    /// Maximum bytes in one received frame
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_BYTES)]
    pub max_line_bytes: usize,
}
