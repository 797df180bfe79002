use crate::body::ResponseBody;
use crate::error::BackendError;
use crate::payload::ChatPayload;

/// A type that represents a chat backend, which accepts one payload per
/// exchange and replies with a streamed plain-text body.
///
/// Once the backend is created, it should behave like a stateless
/// object. It can still have internal state, but callers should not rely
/// on it, and the backend should be prepared for being dropped anytime.
pub trait ChatBackend: Send + Sync {
    /// The error type that may be returned by the backend.
    type Error: BackendError;

    /// The streamed body type for this backend.
    type Body: ResponseBody<Error = Self::Error>;

    /// Sends a request to the backend.
    ///
    /// The returned future resolves once the backend has confirmed the
    /// exchange (a 2xx status with a body), or with an error whose kind
    /// is one of the pre-stream kinds. Implementations must not keep the
    /// payload (and its credential) beyond building the request.
    fn send_request(
        &self,
        payload: &ChatPayload,
    ) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send + 'static;
}
