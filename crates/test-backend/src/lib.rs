//! A local scripted backend for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use bytes::Bytes;
use streamchat_protocol::{
    BackendError, ChatBackend, ChatPayload, ErrorKind, ResponseBody,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// The message of the read failure injected by
/// [`PresetReply::with_failure_after`].
pub const INJECTED_READ_FAILURE: &str = "connection reset by peer";

pub struct ScriptedBody {
    chunks: VecDeque<Bytes>,
    fail_after: Option<usize>,
    delivered: usize,
    finished: bool,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ResponseBody for ScriptedBody {
    type Error = crate::Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>> {
        let this = self.get_mut();
        if this.finished {
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        }

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            if this.fail_after == Some(this.delivered) {
                this.finished = true;
                return Poll::Ready(Err(Error::new(
                    INJECTED_READ_FAILURE,
                    ErrorKind::Read,
                )));
            }
            let Some(chunk) = this.chunks.pop_front() else {
                this.finished = true;
                return Poll::Ready(Ok(None));
            };
            this.delivered += 1;
            return Poll::Ready(Ok(Some(chunk)));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_chunk(cx)
    }
}

/// A local scripted backend for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// backend should reply to each request. The `n`-th request receives the
/// `n`-th reply. If there are no enough replies in the script, a transport
/// error will be returned.
///
/// Clones share the request log, so a test can keep one clone to inspect
/// the requests received by another.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Vec<PresetReply>,
    delay: Option<Duration>,
    request_count: Arc<AtomicUsize>,
    payloads: Arc<Mutex<Vec<ChatPayload>>>,
}

impl ScriptedBackend {
    #[inline]
    pub fn add_reply(&mut self, reply: PresetReply) {
        self.script.push(reply);
    }

    /// Sets the delay before every chunk read.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns how many requests have been sent to this backend.
    #[inline]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Returns the payloads received so far.
    pub fn payloads(&self) -> Vec<ChatPayload> {
        self.payloads
            .lock()
            .map(|payloads| payloads.clone())
            .unwrap_or_default()
    }
}

impl Debug for ScriptedBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedBackend")
            .field("script", &self.script)
            .field("delay", &self.delay)
            .field("request_count", &self.request_count())
            .finish()
    }
}

impl ChatBackend for ScriptedBackend {
    type Error = crate::Error;
    type Body = ScriptedBody;

    fn send_request(
        &self,
        payload: &ChatPayload,
    ) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send + 'static
    {
        let step_idx = self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut payloads) = self.payloads.lock() {
            payloads.push(payload.clone());
        }

        let result = match self.script.get(step_idx).map(|r| &r.outcome) {
            None => Err(Error::new("no enough replies", ErrorKind::Transport)),
            Some(PresetOutcome::Reject { body, .. }) if body.is_empty() => {
                Err(Error::new("Request failed", ErrorKind::Rejected))
            }
            Some(PresetOutcome::Reject { body, .. }) => {
                Err(Error::new(body.clone(), ErrorKind::Rejected))
            }
            Some(PresetOutcome::MissingBody) => {
                Err(Error::new("Request failed", ErrorKind::MissingBody))
            }
            Some(PresetOutcome::Stream { chunks, fail_after }) => {
                Ok(ScriptedBody {
                    chunks: chunks
                        .iter()
                        .map(|c| Bytes::copy_from_slice(c))
                        .collect(),
                    fail_after: *fail_after,
                    delivered: 0,
                    finished: false,
                    delay: self.delay.unwrap_or(Duration::from_millis(1)),
                    sleep: None,
                })
            }
        };
        ready(result)
    }
}
