//! Splits a streamed HTTP body into lines.
//!
//! Messages are delimited by `\r\n` (or a bare `\n`); a blank line is a
//! keep-alive and is passed through so listeners get a chance to halt on an
//! otherwise idle stream.

use bytes::{Buf, BytesMut};
use tracing::warn;

/// Upper bound for a single line; anything longer is discarded.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub struct LineFramer {
    buf: BytesMut,
    max_line_bytes: usize,
    /// Skip bytes up to the next newline (tail of an oversized line).
    discarding: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineFramer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    /// Feed one chunk; returns every line it completed, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            if self.discarding {
                self.discarding = false;
                continue;
            }
            if pos > self.max_line_bytes {
                warn!(
                    line_bytes = pos,
                    limit = self.max_line_bytes,
                    "discarding oversized stream line"
                );
                continue;
            }
            let mut end = pos;
            if end > 0 && line[end - 1] == b'\r' {
                end -= 1;
            }
            lines.push(String::from_utf8_lossy(&line[..end]).into_owned());
        }

        if self.buf.len() > self.max_line_bytes {
            warn!(
                buffered = self.buf.len(),
                limit = self.max_line_bytes,
                "discarding oversized stream line"
            );
            self.buf.advance(self.buf.len());
            self.discarding = true;
        }
        lines
    }

    /// Bytes buffered towards an incomplete line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_crlf_and_lf() {
        let mut framer = LineFramer::default();
        let lines = framer.push(b"{\"a\":1}\r\n{\"b\":2}\n\r\n");
        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#, ""]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn joins_lines_across_chunks() {
        let mut framer = LineFramer::default();
        assert!(framer.push(b"{\"text\":\"hel").is_empty());
        assert!(framer.push(b"lo\"}\r").is_empty());
        assert_eq!(framer.push(b"\n"), vec![r#"{"text":"hello"}"#]);
    }

    #[test]
    fn oversized_line_is_dropped_and_stream_resyncs() {
        let mut framer = LineFramer::new(8);
        assert!(framer.push(b"0123456789").is_empty());
        assert_eq!(framer.pending(), 0);
        assert_eq!(framer.push(b"abc\r\nok\r\n"), vec!["ok"]);

        // Complete within one chunk.
        assert_eq!(framer.push(b"0123456789abcdef\nok\n"), vec!["ok"]);
        assert_eq!(framer.pending(), 0);
    }
}
