//! Append-only transcript of a command's output.

use std::borrow::Cow;

use bytes::BytesMut;

use super::patterns::Terminator;

/// Accumulates output bytes for one collection phase.
///
/// Chunks are appended in arrival order and never reordered or dropped.
/// Bytes are kept as received and decoded only when read back, so a
/// character split across two reads is reassembled.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    buffer: BytesMut,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Append a chunk of output.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Whether the transcript ends with the prompt terminator, ignoring
    /// trailing spaces and line breaks.
    pub fn ends_with_prompt(&self, terminator: Terminator) -> bool {
        terminator.ends(&self.buffer)
    }

    /// Take the transcript as text (lossy UTF-8 conversion) and reset.
    pub fn take(&mut self) -> String {
        let bytes = self.buffer.split();
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    /// The transcript so far as text (lossy UTF-8 conversion).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
