use std::pin::Pin;
use std::task::{self, Poll};

use bytes::Bytes;

use crate::error::BackendError;

/// A streamed response body from a chat backend.
pub trait ResponseBody: Sized + Send + 'static {
    /// The error type that may be returned while reading.
    type Error: BackendError;

    /// Attempts to pull out the next chunk of raw bytes.
    ///
    /// # Return value
    ///
    /// There are several possible return values, each indicating a
    /// distinct body state:
    ///
    /// - `Poll::Pending` means that the body is still waiting for the
    ///   next chunk. Implementations will ensure that the current task
    ///   will be notified when the next chunk may be ready.
    /// - `Poll::Ready(Ok(Some(chunk)))` means the body has a chunk to
    ///   deliver, and may produce further chunks on subsequent calls.
    ///   Chunk boundaries are arbitrary, they may split a multi-byte
    ///   character.
    /// - `Poll::Ready(Ok(None))` means the body has completed.
    /// - `Poll::Ready(Err(error))` means an error occurred while reading
    ///   the body.
    ///
    /// Calling this method after completion or after an error should
    /// always return `None`.
    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>>;
}
