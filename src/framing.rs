//! Terminator-aware line reader
//!
//! Each side of a connection picks its own terminator and may change it
//! between frames, so the terminator is passed to every read instead of
//! being fixed when the reader is built.

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::error::AppError;

/// Reads frames ending in a caller-supplied terminator
///
/// Bytes are accumulated until the buffer ends with the terminator in
/// effect for the current call. Partial frames survive a cancelled read,
/// so `read_line` can be used as a `tokio::select!` branch.
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    max_len: usize,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            buf: Vec::with_capacity(64),
            max_len,
            eof: false,
        }
    }

    /// Read one frame with the terminator stripped
    ///
    /// At end of stream any unterminated bytes are returned as a final
    /// frame; the following call returns `Ok(None)`.
    pub async fn read_line(&mut self, terminator: &str) -> Result<Option<String>, AppError> {
        if self.eof {
            return Ok(None);
        }

        let term = terminator.as_bytes();
        let mut byte = [0u8; 1];

        loop {
            if !term.is_empty() && self.buf.ends_with(term) {
                let end = self.buf.len() - term.len();
                self.buf.truncate(end);
                return Ok(Some(self.take()));
            }

            if self.buf.len() > self.max_len {
                self.buf.clear();
                return Err(AppError::LineTooLong(self.max_len));
            }

            if self.inner.read(&mut byte).await? == 0 {
                self.eof = true;
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take()));
            }
            self.buf.push(byte[0]);
        }
    }

    fn take(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}
