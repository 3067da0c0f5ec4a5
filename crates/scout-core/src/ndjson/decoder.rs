//! Incremental NDJSON decoder.
//!
//! Implements tolerant reader pattern: malformed lines are logged and skipped,
//! invalid UTF-8 sequences are dropped instead of failing the line.

use std::borrow::Cow;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Longest prefix of a bad line echoed into diagnostics.
const PREVIEW_CHARS: usize = 120;

/// Held-back size past which an undelimited tail is reported.
const LARGE_PENDING_BYTES: usize = 1 << 20;

/// Per-stream counters, reported once the stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Lines resolved so far, delimited or terminal.
    pub lines: u64,
    pub records: u64,
    pub blank: u64,
    pub malformed: u64,
    /// Lines that carried invalid UTF-8 sequences.
    pub invalid_utf8: u64,
}

/// Turns arbitrarily chunked bytes into decoded JSON records.
///
/// Bytes after the last `\n` seen are held back until a later chunk completes
/// the line or [`StreamDecoder::finish`] treats them as the terminal line.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Never contains a `\n`.
    buffer: Vec<u8>,
    stats: DecoderStats,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one network read and return the records it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Value> {
        let scanned = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        // Only the appended bytes can hold a delimiter.
        let Some(offset) = self.buffer[scanned..].iter().rposition(|&b| b == b'\n') else {
            if crossed_large_pending(scanned, self.buffer.len()) {
                debug!(pending = self.buffer.len(), "Large NDJSON tail without delimiter");
            }
            return Vec::new();
        };
        let tail = self.buffer.split_off(scanned + offset + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        complete[..complete.len() - 1]
            .split(|&b| b == b'\n')
            .filter_map(|line| self.resolve_line(line))
            .collect()
    }

    /// Resolve the held-back bytes as a final, non-delimited line.
    pub fn finish(mut self) -> (Option<Value>, DecoderStats) {
        let tail = std::mem::take(&mut self.buffer);
        let record = if tail.is_empty() {
            None
        } else {
            self.resolve_line(&tail)
        };
        debug!(
            lines = self.stats.lines,
            records = self.stats.records,
            blank = self.stats.blank,
            malformed = self.stats.malformed,
            invalid_utf8 = self.stats.invalid_utf8,
            "NDJSON stream finished"
        );
        (record, self.stats)
    }

    /// Number of bytes held back waiting for a delimiter.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub const fn stats(&self) -> DecoderStats {
        self.stats
    }

    fn resolve_line(&mut self, line: &[u8]) -> Option<Value> {
        self.stats.lines += 1;
        let (text, lossy) = drop_invalid_utf8(line);
        if lossy {
            self.stats.invalid_utf8 += 1;
            debug!(
                line = self.stats.lines,
                "Dropped invalid UTF-8 sequences from NDJSON line"
            );
        }

        match decode_text(&text) {
            Ok(Some(value)) => {
                self.stats.records += 1;
                Some(value)
            }
            Ok(None) => {
                self.stats.blank += 1;
                None
            }
            Err(e) => {
                self.stats.malformed += 1;
                warn!(line = self.stats.lines, error = %e, "Skipping malformed NDJSON line");
                #[cfg(feature = "metrics")]
                crate::metrics::record_malformed_line();
                None
            }
        }
    }
}

/// Decode a single line. Blank lines yield `Ok(None)`.
pub fn decode_line(line: &[u8]) -> Result<Option<Value>> {
    decode_text(&drop_invalid_utf8(line).0)
}

/// Decode a complete NDJSON document held in memory.
pub fn decode_all(bytes: &[u8]) -> Vec<Value> {
    let mut decoder = StreamDecoder::new();
    let mut records = decoder.feed(bytes);
    records.extend(decoder.finish().0);
    records
}

fn decode_text(text: &str) -> Result<Option<Value>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| Error::MalformedLine {
            reason: e.to_string(),
            preview: preview(trimmed),
        })
}

fn drop_invalid_utf8(bytes: &[u8]) -> (Cow<'_, str>, bool) {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (Cow::Borrowed(text), false);
    }
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    (Cow::Owned(text), true)
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

const fn crossed_large_pending(before: usize, after: usize) -> bool {
    before < LARGE_PENDING_BYTES && after >= LARGE_PENDING_BYTES
}
