use streamchat_protocol::{ChatBackend, Credential, DEFAULT_SYSTEM_PROMPT, ModelId};

use super::{ChatController, FormState};
use crate::exchange::ExchangeClient;
use crate::transcript::{Transcript, TranscriptEvent};

type Observer = Box<dyn Fn(&TranscriptEvent, &Transcript) + Send + Sync>;

/// [`ChatController`] builder.
pub struct ChatControllerBuilder {
    pub(crate) client: ExchangeClient,
    pub(crate) form: FormState,
    pub(crate) on_idle: Option<Box<dyn Fn() + Send + Sync>>,
    pub(crate) observers: Vec<Observer>,
}

impl ChatControllerBuilder {
    /// Creates a new builder with the specified backend.
    #[inline]
    pub fn with_backend<B: ChatBackend + 'static>(backend: B) -> Self {
        Self {
            client: ExchangeClient::new(backend),
            form: FormState {
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
                ..Default::default()
            },
            on_idle: None,
            observers: vec![],
        }
    }

    /// Sets the initial system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.form.system_prompt = prompt.into();
        self
    }

    /// Sets the initially selected model.
    #[inline]
    pub fn with_model(mut self, model: ModelId) -> Self {
        self.form.model = model;
        self
    }

    /// Sets the initial credential.
    #[inline]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.form.credential = credential;
        self
    }

    /// Attaches a callback to be invoked each time an exchange ends, with
    /// or without an error.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Attaches a callback to be invoked after every change of the
    /// transcript, so that a rendering layer can redraw.
    ///
    /// The callback runs on the controller task, it should return quickly.
    #[inline]
    pub fn on_transcript_change(
        mut self,
        observer: impl Fn(&TranscriptEvent, &Transcript) + Send + Sync + 'static,
    ) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Builds the controller.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[inline]
    pub fn build(self) -> ChatController {
        ChatController::spawn_from_builder(self)
    }
}
