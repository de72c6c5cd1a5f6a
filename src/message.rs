//! Wire protocol definitions
//!
//! Line-based protocol shared by server and client:
//! - control lines (`/verb args...`) sent by clients
//! - confirmation receipts (`OK\u{1}nick\u{1}Alice\u{2}SERVER: ...`) sent by the server
//! - anything else is plain display text

use std::str::FromStr;

use crate::error::AppError;
use crate::types::{CONTROL_DELIMITER, CONTROL_MARKER, END_OF_HEADER};

/// Receipt status field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Requested change was applied
    Ok,
    /// Requested change was rejected
    No,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::No => "NO",
        }
    }
}

impl FromStr for Status {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            other => Err(AppError::MalformedReceipt(format!("unknown status '{}'", other))),
        }
    }
}

/// Confirmation receipt (server → client)
///
/// The first echo field is the tag a client matches against its pending
/// changes (`nick`, `msg`, `listen`, `delimit`, `quit`); further fields carry
/// confirmed values, e.g. the accepted nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub status: Status,
    pub echo: Vec<String>,
    pub body: String,
}

impl Receipt {
    /// Successful receipt for the given tag
    pub fn ok(tag: &str, body: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            echo: vec![tag.to_string()],
            body: body.into(),
        }
    }

    /// Rejecting receipt for the given tag
    pub fn no(tag: &str, body: impl Into<String>) -> Self {
        Self {
            status: Status::No,
            echo: vec![tag.to_string()],
            body: body.into(),
        }
    }

    /// Append another echo field
    pub fn with_echo(mut self, field: impl Into<String>) -> Self {
        self.echo.push(field.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Tag the client matches on (first echo field)
    pub fn tag(&self) -> Option<&str> {
        self.echo.first().map(String::as_str)
    }

    /// Confirmed value following the tag, if any
    pub fn value(&self) -> Option<&str> {
        self.echo.get(1).map(String::as_str)
    }

    /// Encode to a single unterminated line
    ///
    /// Reserved bytes are stripped from echo fields and body so the header
    /// can always be split unambiguously.
    pub fn encode(&self) -> String {
        let mut line = String::from(self.status.as_str());
        for field in &self.echo {
            line.push(CONTROL_DELIMITER);
            line.push_str(&scrub(field));
        }
        line.push(END_OF_HEADER);
        line.push_str(&scrub(&self.body));
        line
    }
}

fn scrub(text: &str) -> String {
    text.chars()
        .filter(|c| *c != CONTROL_DELIMITER && *c != END_OF_HEADER)
        .collect()
}

/// A decoded line received by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<'a> {
    Receipt(Receipt),
    /// No header marker: display verbatim
    Plain(&'a str),
}

/// Decode one received line (terminator already stripped)
pub fn decode(line: &str) -> Result<Inbound<'_>, AppError> {
    let Some((header, body)) = line.split_once(END_OF_HEADER) else {
        return Ok(Inbound::Plain(line));
    };

    let mut fields = header.split(CONTROL_DELIMITER);
    let status = fields.next().unwrap_or_default().parse::<Status>()?;
    let echo = fields.map(str::to_string).collect();

    Ok(Inbound::Receipt(Receipt {
        status,
        echo,
        body: body.to_string(),
    }))
}

/// Parsed control line (client → server)
///
/// Borrowed from the raw line for the duration of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage<'a> {
    raw: &'a str,
    /// Token following the control marker, up to the first space
    pub verb: &'a str,
    /// Remaining space-separated arguments (empty tokens dropped)
    pub args: Vec<&'a str>,
}

impl<'a> ControlMessage<'a> {
    /// Parse a line starting with the control marker
    ///
    /// Returns None for plain text.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let body = raw.strip_prefix(CONTROL_MARKER)?;
        let (verb, rest) = body.split_once(' ').unwrap_or((body, ""));
        let args = rest.split(' ').filter(|arg| !arg.is_empty()).collect();
        Some(Self { raw, verb, args })
    }

    /// Everything after `/verb `, taken verbatim
    ///
    /// Used for arguments that may contain spaces (nicknames, target names,
    /// delimiter text). None when no argument was given.
    pub fn trailing(&self) -> Option<&'a str> {
        if self.args.is_empty() {
            return None;
        }
        let prefix = CONTROL_MARKER.len_utf8() + self.verb.len() + 1;
        self.raw.get(prefix..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_encode_nick() {
        let receipt = Receipt::ok("nick", "SERVER: Name successfully set to Alice").with_echo("Alice");
        assert_eq!(
            receipt.encode(),
            "OK\u{1}nick\u{1}Alice\u{2}SERVER: Name successfully set to Alice"
        );
    }

    #[test]
    fn test_receipt_round_trip() {
        let receipt = Receipt::ok("nick", "done").with_echo("Alice");
        let line = receipt.encode();
        match decode(&line).unwrap() {
            Inbound::Receipt(decoded) => {
                assert_eq!(decoded.status, Status::Ok);
                assert_eq!(decoded.echo, vec!["nick".to_string(), "Alice".to_string()]);
                assert_eq!(decoded.body, "done");
            }
            other => panic!("Wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_encode_strips_reserved_bytes() {
        let receipt = Receipt::no("li\u{1}sten", "a\u{2}b");
        assert_eq!(receipt.encode(), "NO\u{1}listen\u{2}ab");
    }

    #[test]
    fn test_decode_plain_line() {
        let line = "Alice: hello there";
        assert_eq!(decode(line).unwrap(), Inbound::Plain(line));
    }

    #[test]
    fn test_decode_body_keeps_later_markers() {
        match decode("NO\u{1}listen\u{2}SERVER: You are already a listener.").unwrap() {
            Inbound::Receipt(r) => {
                assert!(!r.is_ok());
                assert_eq!(r.tag(), Some("listen"));
                assert_eq!(r.value(), None);
                assert_eq!(r.body, "SERVER: You are already a listener.");
            }
            other => panic!("Wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_status() {
        let err = decode("MAYBE\u{1}nick\u{2}body").unwrap_err();
        assert!(matches!(err, AppError::MalformedReceipt(_)));
    }

    #[test]
    fn test_control_message_parse() {
        let msg = ControlMessage::parse("/nick Alice Smith").unwrap();
        assert_eq!(msg.verb, "nick");
        assert_eq!(msg.args, vec!["Alice", "Smith"]);
        assert_eq!(msg.trailing(), Some("Alice Smith"));
    }

    #[test]
    fn test_control_message_without_args() {
        let msg = ControlMessage::parse("/quit").unwrap();
        assert_eq!(msg.verb, "quit");
        assert!(msg.args.is_empty());
        assert_eq!(msg.trailing(), None);

        // Only blanks after the verb count as no argument
        let msg = ControlMessage::parse("/nick   ").unwrap();
        assert_eq!(msg.trailing(), None);
    }

    #[test]
    fn test_plain_text_is_not_control() {
        assert!(ControlMessage::parse("hello /nick").is_none());
    }
}
