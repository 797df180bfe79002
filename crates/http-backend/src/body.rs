use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use pin_project_lite::pin_project;
use streamchat_protocol::{ErrorKind, ResponseBody};

use crate::Error;
use crate::io::{Chunks, ChunksError};

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextChunk = (Result<Option<Bytes>, ChunksError>, Chunks);

pin_project! {
    /// The streamed plain-text body of a confirmed exchange.
    pub struct HttpBody {
        next_chunk_fut: Option<PinnedFuture<NextChunk>>,
        received_bytes: usize,
    }
}

impl HttpBody {
    #[inline]
    pub(crate) fn from_chunks(chunks: Chunks) -> Self {
        Self {
            next_chunk_fut: Some(Box::pin(next_chunk(chunks))),
            received_bytes: 0,
        }
    }
}

impl ResponseBody for HttpBody {
    type Error = crate::Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>> {
        let this = self.project();
        let Some(next_chunk_fut) = this.next_chunk_fut else {
            // The body has been exhausted or has failed.
            return Poll::Ready(Ok(None));
        };
        let (result, chunks) = ready!(next_chunk_fut.as_mut().poll(cx));
        match result {
            Ok(Some(chunk)) => {
                *this.received_bytes += chunk.len();
                trace!("got a chunk of {} bytes", chunk.len());
                // The body may still have more data to pull, create a new
                // future for the next chunk.
                *this.next_chunk_fut = Some(Box::pin(next_chunk(chunks)));
                Poll::Ready(Ok(Some(chunk)))
            }
            Ok(None) => {
                debug!("body finished after {} bytes", this.received_bytes);
                *this.next_chunk_fut = None;
                Poll::Ready(Ok(None))
            }
            Err(err) => {
                warn!("body failed after {} bytes: {err}", this.received_bytes);
                *this.next_chunk_fut = None;
                Poll::Ready(Err(Error::new(format!("{err}"), ErrorKind::Read)))
            }
        }
    }
}

async fn next_chunk(mut chunks: Chunks) -> NextChunk {
    let result = chunks.next_chunk().await;
    (result, chunks)
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use streamchat_protocol::BackendError;

    use super::*;

    async fn next(
        mut body: Pin<&mut HttpBody>,
    ) -> Result<Option<Bytes>, Error> {
        poll_fn(|cx| body.as_mut().poll_next_chunk(cx)).await
    }

    #[tokio::test]
    async fn test_chunks_in_order() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Ok(Bytes::from_static(b"Hello, ")),
                Ok(Bytes::from_static(b"world!")),
            ]
            .into(),
        );
        let mut body = pin!(HttpBody::from_chunks(chunks));
        assert_eq!(next(body.as_mut()).await.unwrap().unwrap(), "Hello, ");
        assert_eq!(next(body.as_mut()).await.unwrap().unwrap(), "world!");
        assert_eq!(next(body.as_mut()).await.unwrap(), None);
        assert_eq!(next(body.as_mut()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_failure_ends_body() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Ok(Bytes::from_static(b"partial")),
                Err(ChunksError("connection reset".to_owned())),
                Ok(Bytes::from_static(b"never seen")),
            ]
            .into(),
        );
        let mut body = pin!(HttpBody::from_chunks(chunks));
        assert_eq!(next(body.as_mut()).await.unwrap().unwrap(), "partial");
        let err = next(body.as_mut()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
        assert_eq!(err.message(), "connection reset");
        assert_eq!(next(body.as_mut()).await.unwrap(), None);
    }
}
