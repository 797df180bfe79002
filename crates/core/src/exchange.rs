use std::pin::Pin;
use std::sync::Arc;

use streamchat_protocol::{ChatBackend, ChatPayload};
use tracing::Instrument;

use crate::error::{ConnectionError, ExchangeError, StreamReadError};
use crate::stream::{StreamStats, consume_body};

/// Progress of a running exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExchangeEvent {
    /// The backend confirmed the exchange, the reply is about to stream.
    Opened,
    /// A decoded fragment of the reply.
    Fragment(String),
}

pub type ExchangeResult = Result<StreamStats, ExchangeError>;
type BoxedExchangeFuture = Pin<Box<dyn Future<Output = ExchangeResult> + Send>>;
type EventFn = Box<dyn FnMut(ExchangeEvent) + Send + 'static>;
type HandlerFn =
    Arc<dyn Fn(ChatPayload, EventFn) -> BoxedExchangeFuture + Send + Sync>;

/// A wrapper around a chat backend that runs one exchange at a time and
/// provides a type-erased interface for the controller.
#[derive(Clone)]
pub struct ExchangeClient {
    handler_fn: HandlerFn,
}

impl ExchangeClient {
    #[inline]
    pub fn new<B: ChatBackend + 'static>(backend: B) -> Self {
        // We have to erase the type `B`, since the controller doesn't have
        // a generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |payload, on_event| {
            let fut = backend.send_request(&payload);
            // The request has been built, the payload (and the credential
            // in it) is not needed anymore.
            drop(payload);
            Box::pin(
                async move { run_exchange::<B>(fut.await, on_event).await }
                    .instrument(trace_span!("chat exchange")),
            )
        });
        Self { handler_fn }
    }

    /// Runs an exchange to its end.
    ///
    /// `on_event` receives [`ExchangeEvent::Opened`] at most once, then
    /// every fragment in arrival order. There is no way to cancel an
    /// exchange once it started.
    #[inline]
    pub async fn run(
        &self,
        payload: ChatPayload,
        on_event: impl FnMut(ExchangeEvent) + Send + 'static,
    ) -> ExchangeResult {
        (self.handler_fn)(payload, Box::new(on_event)).await
    }
}

async fn run_exchange<B: ChatBackend>(
    body_or_err: Result<B::Body, B::Error>,
    mut on_event: EventFn,
) -> ExchangeResult {
    let body = match body_or_err {
        Ok(body) => body,
        Err(err) => {
            error!("exchange failed before streaming: {err}");
            return Err(ExchangeError::Connection(
                ConnectionError::from_backend(&err),
            ));
        }
    };

    trace!("start receiving the reply");
    on_event(ExchangeEvent::Opened);

    consume_body(body, |fragment| {
        on_event(ExchangeEvent::Fragment(fragment));
    })
    .await
    .map_err(|err: StreamReadError| {
        error!("exchange failed while streaming: {err}");
        ExchangeError::StreamRead(err)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use streamchat_protocol::{Credential, ErrorKind, ModelId};
    use streamchat_test_backend::{PresetReply, ScriptedBackend};

    use super::*;

    fn payload() -> ChatPayload {
        ChatPayload {
            system_prompt: String::new(),
            user_text: "Hi".to_owned(),
            model: ModelId::default(),
            credential: Credential::new("sk-test"),
        }
    }

    #[tokio::test]
    async fn test_run() {
        let mut backend = ScriptedBackend::default();
        for _ in 0..3 {
            backend.add_reply(PresetReply::with_text_chunks([
                "How ", "are ", "you?",
            ]));
        }
        let client = ExchangeClient::new(backend);

        for _ in 0..3 {
            let events = Arc::new(Mutex::new(vec![]));
            let stats = client
                .run(payload(), {
                    let events = Arc::clone(&events);
                    move |event| events.lock().unwrap().push(event)
                })
                .await
                .unwrap();
            assert_eq!(stats.fragments, 3);
            assert_eq!(
                *events.lock().unwrap(),
                [
                    ExchangeEvent::Opened,
                    ExchangeEvent::Fragment("How ".to_owned()),
                    ExchangeEvent::Fragment("are ".to_owned()),
                    ExchangeEvent::Fragment("you?".to_owned()),
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let mut backend = ScriptedBackend::default();
        backend.add_reply(PresetReply::rejected(401, "Invalid API key"));
        backend.add_reply(
            PresetReply::with_text_chunks(["a", "b"]).with_failure_after(1),
        );
        let client = ExchangeClient::new(backend);

        let opened = Arc::new(Mutex::new(false));
        let err = client
            .run(payload(), {
                let opened = Arc::clone(&opened);
                move |_| *opened.lock().unwrap() = true
            })
            .await
            .unwrap_err();
        let err = match err {
            ExchangeError::Connection(err) => err,
            err => panic!("unexpected error: {err:?}"),
        };
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(err.to_string(), "Invalid API key");
        assert!(!*opened.lock().unwrap());

        let err = client.run(payload(), |_| {}).await.unwrap_err();
        assert!(matches!(err, ExchangeError::StreamRead(_)));
    }
}
