//! Terminal client for the chat server
//!
//! Reads typed text from stdin, sends complete messages using the client's
//! send terminator, and prints whatever the server sends back.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use pair_chat::{ClientConfig, ClientEvent, ClientState, LineReader};

const DIVIDER: &str = "----------------------------------------";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pair_chat=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::parse();

    let stream = TcpStream::connect(&config.server).await?;
    debug!("Connected to {}", config.server);
    println!("Connected to {}. Use /nick <name> to pick a name.", config.server);

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = LineReader::new(read_half, config.max_line_bytes);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let mut state = ClientState::new();
    let mut input = String::new();

    loop {
        let terminator = state.receive_terminator().to_string();
        tokio::select! {
            typed = stdin.next_line() => {
                let Some(typed) = typed? else {
                    break;
                };
                input.push_str(&typed);
                input.push('\n');

                while let Some(message) = state.take_message(&mut input) {
                    let Some(outgoing) = state.prepare(&message) else {
                        continue;
                    };
                    write_half.write_all(outgoing.frame.as_bytes()).await?;
                    if let Some(echo) = outgoing.local_echo {
                        println!("{}", echo);
                    }
                }
            }
            received = reader.read_line(&terminator) => match received {
                Ok(Some(line)) => match state.receive(&line) {
                    ClientEvent::Display(text) => println!("{}", text),
                    ClientEvent::NewConversation(text) => {
                        println!("{}", DIVIDER);
                        println!("{}", text);
                    }
                    ClientEvent::Closed(text) => {
                        println!("{}", text);
                        break;
                    }
                },
                Ok(None) => {
                    println!("The connection to the server was closed.");
                    break;
                }
                Err(e) => {
                    warn!("The connection to the server was interrupted: {}", e);
                    break;
                }
            },
        }
    }

    let _ = write_half.shutdown().await;
    Ok(())
}
