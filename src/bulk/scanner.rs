//! Capped line scanning
//!
//! Reads newline-delimited records from a buffered reader into a growable
//! buffer that starts small and is allowed to grow up to a hard cap. A line
//! exceeding the cap is an error; bulk feeds occasionally embed full state
//! snapshots that run to megabytes, hence the generous ceiling.

use std::io::BufRead;

use crate::client::{ClientError, ClientResult};

/// Initial capacity of the line buffer.
pub const INITIAL_LINE_BUFFER: usize = 64 * 1024;

/// Hard cap on a single line.
pub const MAX_LINE_BYTES: usize = 20 * 1024 * 1024;

/// Iterator-style scanner over newline-delimited byte records.
pub struct LineScanner<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    max_line: usize,
    done: bool,
}

impl<R: BufRead> LineScanner<R> {
    /// Create a scanner with the default line cap.
    pub fn new(reader: R) -> Self {
        Self::with_max_line(reader, MAX_LINE_BYTES)
    }

    /// Create a scanner with a custom line cap.
    pub fn with_max_line(reader: R, max_line: usize) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(INITIAL_LINE_BUFFER.min(max_line)),
            max_line,
            done: false,
        }
    }

    /// Return the next line without its terminator, or `Ok(None)` at EOF.
    ///
    /// A trailing `\r` is stripped so CRLF input scans the same as LF. Once a
    /// line exceeds the cap the scanner returns [`ClientError::LineTooLong`]
    /// and yields nothing further.
    pub fn next_line(&mut self) -> ClientResult<Option<&[u8]>> {
        if self.done {
            return Ok(None);
        }
        self.buf.clear();

        loop {
            let available = self
                .reader
                .fill_buf()
                .map_err(|e| ClientError::Archive(format!("read archive member: {e}")))?;

            if available.is_empty() {
                self.done = true;
                if self.buf.is_empty() {
                    return Ok(None);
                }
                strip_carriage_return(&mut self.buf);
                return Ok(Some(&self.buf));
            }

            match available.iter().position(|&b| b == b'\n') {
                Some(newline) => {
                    if self.buf.len() + newline > self.max_line {
                        self.done = true;
                        return Err(ClientError::LineTooLong {
                            size: self.buf.len() + newline,
                            max: self.max_line,
                        });
                    }
                    self.buf.extend_from_slice(&available[..newline]);
                    self.reader.consume(newline + 1);
                    strip_carriage_return(&mut self.buf);
                    return Ok(Some(&self.buf));
                }
                None => {
                    let chunk = available.len();
                    if self.buf.len() + chunk > self.max_line {
                        self.done = true;
                        return Err(ClientError::LineTooLong {
                            size: self.buf.len() + chunk,
                            max: self.max_line,
                        });
                    }
                    self.buf.extend_from_slice(available);
                    self.reader.consume(chunk);
                }
            }
        }
    }
}

fn strip_carriage_return(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}
