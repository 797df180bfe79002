//! A chat backend that talks to the `/api/chat` HTTP endpoint.

#[macro_use]
extern crate tracing;

mod body;
mod config;
mod io;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, Response, StatusCode, header};
use streamchat_protocol::{BackendError, ChatBackend, ChatPayload, ErrorKind};

pub use body::HttpBody;
pub use config::{HttpBackendConfig, HttpBackendConfigBuilder};
use io::Chunks;
use proto::HealthStatus;

/// The detail used when a rejected request has no readable body.
pub const GENERIC_FAILURE_DETAIL: &str = "Request failed";

/// Error type for [`HttpBackend`].
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

    #[inline]
    fn transport(err: reqwest::Error) -> Self {
        Self::new(format!("{err}"), ErrorKind::Transport)
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// HTTP chat backend.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    config: Arc<HttpBackendConfig>,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` with the given configuration.
    #[inline]
    pub fn new(config: HttpBackendConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Probes the health endpoint of the backend.
    pub async fn health_check(&self) -> Result<(), Error> {
        let resp = self
            .client
            .get(self.config.health_url())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(Error::transport)?;
        let status: HealthStatus = resp
            .json()
            .await
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Read))?;
        if !status.is_ok() {
            return Err(Error::new(
                format!("backend reported status {:?}", status.status),
                ErrorKind::Rejected,
            ));
        }
        Ok(())
    }
}

impl ChatBackend for HttpBackend {
    type Error = Error;
    type Body = HttpBody;

    fn send_request(
        &self,
        payload: &ChatPayload,
    ) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send + 'static
    {
        // The body is serialized right away, so the credential doesn't
        // outlive this call.
        let resp_fut = self
            .client
            .post(self.config.chat_url())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/plain")
            .json(&proto::create_request(payload))
            .send();
        let model = payload.model;

        async move {
            debug!("sending chat request with model {model}");
            let resp = resp_fut.await.map_err(Error::transport)?;

            let status = resp.status();
            if !status.is_success() {
                // Read the whole body as the error detail.
                let detail = resp.text().await.unwrap_or_default();
                let detail = detail.trim();
                warn!("chat request rejected with {status}");
                return Err(Error::new(
                    if detail.is_empty() {
                        GENERIC_FAILURE_DETAIL
                    } else {
                        detail
                    },
                    ErrorKind::Rejected,
                ));
            }
            if status == StatusCode::NO_CONTENT
                || status == StatusCode::RESET_CONTENT
            {
                return Err(Error::new(
                    GENERIC_FAILURE_DETAIL,
                    ErrorKind::MissingBody,
                ));
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_text = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.type_() == mime::TEXT)
                .unwrap_or(true);
            if !is_text {
                warn!("unexpected content type: {content_type:?}");
            }

            // Here we got a successful response.
            Ok(HttpBody::from_chunks(Chunks::from_response(resp)))
        }
    }
}
