//! Errors surfaced by a chat exchange.
//!
//! Every error here renders as a single short message that can be shown
//! to the user as is.

use std::error::Error;
use std::fmt::{self, Display};

use streamchat_protocol::{BackendError, ErrorKind};

/// The message shown when a failure doesn't carry any detail.
pub const FALLBACK_FAILURE_MESSAGE: &str =
    "Failed to send message. Please check your API key and try again.";

/// The input was rejected before any network activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValidationError {
    /// The user text is empty or whitespace-only.
    EmptyMessage,
    /// The credential is empty or whitespace-only.
    MissingCredential,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Both cases share one message, the form marks both fields as
        // required.
        write!(f, "Please enter a message and API key")
    }
}

impl Error for ValidationError {}

/// The exchange failed before the reply started streaming.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionError {
    kind: ErrorKind,
    detail: String,
}

impl ConnectionError {
    #[inline]
    pub(crate) fn new<S: Into<String>>(kind: ErrorKind, detail: S) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Wraps a backend error that occurred before streaming began.
    ///
    /// A read error can't happen before there is a body, such a kind is
    /// reported as a transport error instead.
    pub(crate) fn from_backend<E: BackendError + ?Sized>(err: &E) -> Self {
        let mut kind = err.kind();
        if !kind.is_pre_stream() {
            warn!("backend reported \"{kind}\" before streaming");
            kind = ErrorKind::Transport;
        }
        Self::new(kind, err.to_string())
    }

    /// Returns the kind of the backend error behind this one.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error detail.
    #[inline]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(non_empty_or_fallback(&self.detail))
    }
}

impl Error for ConnectionError {}

/// Reading or decoding the reply failed after it started streaming.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StreamReadError {
    detail: String,
}

impl StreamReadError {
    #[inline]
    pub(crate) fn new<S: Into<String>>(detail: S) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Returns the error detail.
    #[inline]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl Display for StreamReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(non_empty_or_fallback(&self.detail))
    }
}

impl Error for StreamReadError {}

/// Describes how a chat exchange failed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeError {
    /// See [`ConnectionError`].
    Connection(ConnectionError),
    /// See [`StreamReadError`].
    StreamRead(StreamReadError),
}

impl Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::Connection(err) => Display::fmt(err, f),
            ExchangeError::StreamRead(err) => Display::fmt(err, f),
        }
    }
}

impl Error for ExchangeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExchangeError::Connection(err) => Some(err),
            ExchangeError::StreamRead(err) => Some(err),
        }
    }
}

#[inline]
fn non_empty_or_fallback(detail: &str) -> &str {
    if detail.trim().is_empty() {
        FALLBACK_FAILURE_MESSAGE
    } else {
        detail
    }
}
