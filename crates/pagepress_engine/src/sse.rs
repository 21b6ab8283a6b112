use bytes::{Buf, BytesMut};
use thiserror::Error;

/// Longest line the decoder buffers before giving up on the stream.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

const BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("event stream line exceeds {max} bytes")]
pub struct LineTooLong {
    pub max: usize,
}

/// Incremental `text/event-stream` decoder.
///
/// Bytes are fed as they arrive; every completed `message` event yields its data
/// payload (multiple `data:` lines joined with `\n`). Comments, `id` and `retry`
/// fields are ignored, and events with another `event:` name are dropped.
/// An event that is not terminated by a blank line is never dispatched.
#[derive(Debug)]
pub struct SseDecoder {
    buf: BytesMut,
    scanned: usize,
    max_line: usize,
    started: bool,
    data: String,
    has_data: bool,
    event_name: Option<String>,
    skip_lf: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            max_line,
            started: false,
            data: String::new(),
            has_data: false,
            event_name: None,
            skip_lf: false,
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, LineTooLong> {
        self.buf.extend_from_slice(chunk);
        let mut payloads = Vec::new();

        if !self.started && !self.strip_bom() {
            return Ok(payloads);
        }

        loop {
            // The `\n` of a `\r\n` pair may arrive in a later chunk.
            if self.skip_lf && !self.buf.is_empty() {
                if self.buf[0] == b'\n' {
                    self.buf.advance(1);
                    self.scanned = self.scanned.saturating_sub(1);
                }
                self.skip_lf = false;
            }

            let found = self.buf[self.scanned..]
                .iter()
                .position(|&b| b == b'\n' || b == b'\r');
            let Some(offset) = found else {
                self.scanned = self.buf.len();
                if self.buf.len() > self.max_line {
                    return Err(LineTooLong { max: self.max_line });
                }
                break;
            };
            let pos = self.scanned + offset;
            if pos > self.max_line {
                return Err(LineTooLong { max: self.max_line });
            }
            let line = self.buf.split_to(pos);
            self.skip_lf = self.buf[0] == b'\r';
            self.buf.advance(1);
            self.scanned = 0;

            let line = String::from_utf8_lossy(&line);
            if let Some(payload) = self.process_line(&line) {
                payloads.push(payload);
            }
        }

        Ok(payloads)
    }

    /// Drops one leading byte order mark. Returns false while the first bytes
    /// could still be the start of one.
    fn strip_bom(&mut self) -> bool {
        let n = self.buf.len().min(BOM.len());
        if self.buf[..n] != BOM[..n] {
            self.started = true;
        } else if n == BOM.len() {
            self.buf.advance(n);
            self.started = true;
        }
        self.started
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.event_name = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        let event_name = self.event_name.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        let data = std::mem::take(&mut self.data);
        if data.is_empty() {
            return None;
        }
        match event_name.as_deref() {
            None | Some("") | Some("message") => Some(data),
            Some(_) => None,
        }
    }
}
