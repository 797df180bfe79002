use streamchat_core::transcript::{Transcript, TranscriptEvent};
use streamchat_core::{
    ChatController, ChatControllerBuilder, ControllerClosedError, ModelId,
    SessionSnapshot,
};
use streamchat_http_backend::{
    Error as HttpError, HttpBackend, HttpBackendConfigBuilder,
};

use crate::AppConfig;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    backend: HttpBackend,
    controller_builder: ChatControllerBuilder,
}

impl SessionBuilder {
    /// Creates a session builder that talks to the backend in `config`.
    pub fn from_config(config: AppConfig) -> Self {
        let AppConfig {
            base_url,
            credential,
            model,
            system_prompt,
        } = config;
        debug!("chat backend at {base_url}");

        let backend = HttpBackend::new(
            HttpBackendConfigBuilder::new()
                .with_base_url(base_url)
                .build(),
        );
        let mut controller_builder =
            ChatControllerBuilder::with_backend(backend.clone())
                .with_credential(credential)
                .with_model(model);
        if let Some(prompt) = system_prompt {
            controller_builder = controller_builder.with_system_prompt(prompt);
        }
        Self {
            backend,
            controller_builder,
        }
    }

    /// Attaches a callback to be invoked when an exchange ends.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.controller_builder = self.controller_builder.on_idle(on_idle);
        self
    }

    /// Attaches a callback to be invoked when the transcript changes.
    #[inline]
    pub fn on_transcript_change(
        mut self,
        observer: impl Fn(&TranscriptEvent, &Transcript) + Send + Sync + 'static,
    ) -> Self {
        self.controller_builder =
            self.controller_builder.on_transcript_change(observer);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        Session {
            backend: self.backend,
            controller: self.controller_builder.build(),
        }
    }
}

/// A chat session, like a window that displays messages and has an input
/// box.
///
/// The session is basically a wrapper around [`ChatController`], you can
/// reach the controller directly for finer control of the form.
pub struct Session {
    backend: HttpBackend,
    controller: ChatController,
}

impl Session {
    /// Sends a message to the session.
    #[inline]
    pub fn send_message(&self, message: &str) -> Result<(), ControllerClosedError> {
        self.controller.set_user_text(message)?;
        self.controller.send()
    }

    /// Clears the chat.
    #[inline]
    pub fn clear_chat(&self) -> Result<(), ControllerClosedError> {
        self.controller.clear_chat()
    }

    /// Selects the model for the next messages.
    #[inline]
    pub fn set_model(&self, model: ModelId) -> Result<(), ControllerClosedError> {
        self.controller.set_model(model)
    }

    /// Returns the current state of the session.
    #[inline]
    pub async fn snapshot(&self) -> Result<SessionSnapshot, ControllerClosedError> {
        self.controller.snapshot().await
    }

    /// Checks whether the backend is reachable.
    #[inline]
    pub async fn health_check(&self) -> Result<(), HttpError> {
        self.backend.health_check().await
    }

    /// Returns the underlying controller.
    #[inline]
    pub fn controller(&self) -> &ChatController {
        &self.controller
    }
}
