//! Incremental UTF-8 decoding of chunked bytes.

use std::str;

const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// A stateful UTF-8 decoder.
///
/// Chunk boundaries may fall inside a multi-byte character. The decoder
/// keeps the incomplete trailing bytes of one chunk and completes them
/// with the leading bytes of the next one, so feeding the bytes in any
/// split yields the same text as feeding them at once.
///
/// Invalid sequences are replaced with U+FFFD instead of failing the
/// stream.
#[derive(Clone, Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Creates a decoder without pending bytes.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if an incomplete sequence is waiting for more bytes.
    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Decodes the next chunk, returning all text that is complete so far.
    ///
    /// The returned string is empty if the chunk only extends a pending
    /// sequence.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        if self.pending.is_empty() {
            return self.decode_buf(chunk);
        }
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);
        self.decode_buf(&buf)
    }

    /// Ends the input. A sequence still pending at this point can never
    /// be completed and decodes to one U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        REPLACEMENT.to_string()
    }

    fn decode_buf(&mut self, bytes: &[u8]) -> String {
        let mut text = String::with_capacity(bytes.len());
        let mut chunks = bytes.utf8_chunks().peekable();
        while let Some(chunk) = chunks.next() {
            text.push_str(chunk.valid());
            let invalid = chunk.invalid();
            if invalid.is_empty() {
                continue;
            }
            // Only the tail of the input can be an unfinished sequence.
            let unfinished = chunks.peek().is_none()
                && str::from_utf8(invalid)
                    .is_err_and(|err| err.error_len().is_none());
            if unfinished {
                self.pending.extend_from_slice(invalid);
            } else {
                text.push(REPLACEMENT);
            }
        }
        text
    }
}
