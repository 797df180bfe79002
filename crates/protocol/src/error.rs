use std::error::Error;
use std::fmt::{self, Display};

/// The kind of error that occurred while talking to a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend answered with a non-2xx status.
    Rejected,
    /// The backend answered without a readable body.
    MissingBody,
    /// The request could not be delivered.
    Transport,
    /// Reading the body failed after streaming began.
    Read,
}

impl ErrorKind {
    /// Returns `true` if errors of this kind can only happen before the
    /// first chunk of the body is delivered.
    #[inline]
    pub fn is_pre_stream(&self) -> bool {
        !matches!(self, ErrorKind::Read)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Rejected => write!(f, "Rejected"),
            ErrorKind::MissingBody => write!(f, "Missing body"),
            ErrorKind::Transport => write!(f, "Transport error"),
            ErrorKind::Read => write!(f, "Read error"),
        }
    }
}

/// The error type for a chat backend.
///
/// The `Display` output is used as the user-visible error detail, so it
/// should be a single short message. For rejected requests it should be
/// the text the backend returned.
pub trait BackendError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}
