//! Turns a streamed response body into text fragments.

use std::future::poll_fn;
use std::pin::Pin;

use streamchat_protocol::ResponseBody;

use crate::decoder::Utf8Decoder;
use crate::error::StreamReadError;

/// Counters collected while consuming a body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StreamStats {
    /// Number of raw chunks read.
    pub chunks: usize,
    /// Number of raw bytes read.
    pub bytes: usize,
    /// Number of non-empty fragments yielded.
    pub fragments: usize,
}

/// A lazy sequence of decoded text fragments over a response body.
///
/// Fragments come out in the order the body delivers the bytes. The
/// sequence is finite and can't be restarted: once it has ended, with or
/// without an error, [`FragmentStream::next_fragment`] keeps returning
/// `None`.
pub struct FragmentStream<B> {
    body: Pin<Box<B>>,
    decoder: Utf8Decoder,
    stats: StreamStats,
    done: bool,
}

impl<B: ResponseBody> FragmentStream<B> {
    /// Creates a fragment stream over an open body.
    #[inline]
    pub fn new(body: B) -> Self {
        Self {
            body: Box::pin(body),
            decoder: Utf8Decoder::new(),
            stats: StreamStats::default(),
            done: false,
        }
    }

    /// Pulls the next fragment.
    ///
    /// Chunks that only carry part of a multi-byte character don't
    /// produce a fragment on their own, the stream reads on until some
    /// text is complete.
    pub async fn next_fragment(
        &mut self,
    ) -> Result<Option<String>, StreamReadError> {
        while !self.done {
            let chunk =
                poll_fn(|cx| self.body.as_mut().poll_next_chunk(cx)).await;
            let text = match chunk {
                Ok(Some(bytes)) => {
                    self.stats.chunks += 1;
                    self.stats.bytes += bytes.len();
                    self.decoder.decode(&bytes)
                }
                Ok(None) => {
                    self.done = true;
                    self.decoder.finish()
                }
                Err(err) => {
                    self.done = true;
                    return Err(StreamReadError::new(err.to_string()));
                }
            };
            if !text.is_empty() {
                self.stats.fragments += 1;
                return Ok(Some(text));
            }
        }
        Ok(None)
    }

    /// Returns the counters collected so far.
    #[inline]
    pub fn stats(&self) -> StreamStats {
        self.stats
    }
}

/// Feeds every fragment of `body` to `on_fragment`, in arrival order.
///
/// On a read error the fragments already delivered stay delivered, the
/// error is returned to the caller.
pub async fn consume_body<B: ResponseBody>(
    body: B,
    mut on_fragment: impl FnMut(String),
) -> Result<StreamStats, StreamReadError> {
    let mut stream = FragmentStream::new(body);
    while let Some(fragment) = stream.next_fragment().await? {
        on_fragment(fragment);
    }
    let stats = stream.stats();
    debug!(
        "body consumed: {} chunks, {} bytes, {} fragments",
        stats.chunks, stats.bytes, stats.fragments
    );
    Ok(stats)
}
