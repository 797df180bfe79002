mod builder;
mod state;
#[cfg(test)]
mod tests;
mod transition;

use std::error::Error;
use std::fmt;

use streamchat_protocol::{Credential, ModelId};
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use crate::exchange::{ExchangeEvent, ExchangeResult};
use crate::transcript::Message;
pub use builder::ChatControllerBuilder;
use state::ControllerState;
pub use transition::SUCCESS_NOTICE;

/// The lifecycle phase of the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChatPhase {
    /// No exchange is in flight.
    #[default]
    Idle,
    /// A request has been sent, the backend hasn't confirmed it yet.
    Sending,
    /// The reply is streaming into the transcript.
    Streaming,
}

/// The values of the input form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    /// The instructions for the assistant.
    pub system_prompt: String,
    /// The message being typed.
    pub user_text: String,
    /// The selected model.
    pub model: ModelId,
    /// The secret forwarded to the backend.
    pub credential: Credential,
}

/// A copy of everything a rendering layer needs to draw the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The current phase.
    pub phase: ChatPhase,
    /// The transcript, in display order.
    pub messages: Vec<Message>,
    /// The error to show, if any.
    pub last_error: Option<String>,
    /// The notice to show, if any.
    pub last_notice: Option<String>,
    /// The input form.
    pub form: FormState,
}

impl SessionSnapshot {
    /// Returns `true` while an exchange is in flight.
    #[inline]
    pub fn is_sending(&self) -> bool {
        self.phase != ChatPhase::Idle
    }

    /// Returns `true` if a send would start an exchange.
    #[inline]
    pub fn can_send(&self) -> bool {
        !self.is_sending()
            && !self.form.user_text.trim().is_empty()
            && !self.form.credential.is_blank()
    }

    /// Returns `true` if the clear action should be enabled.
    #[inline]
    pub fn can_clear(&self) -> bool {
        !self.is_sending() && !self.messages.is_empty()
    }
}

/// Error returned when the controller task is no longer running.
pub struct ControllerClosedError;

impl fmt::Debug for ControllerClosedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerClosedError").finish()
    }
}

impl fmt::Display for ControllerClosedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "the chat controller has stopped".fmt(f)
    }
}

impl Error for ControllerClosedError {}

#[derive(Debug)]
enum Command {
    SetSystemPrompt(String),
    SetUserText(String),
    SetModel(ModelId),
    SetCredential(Credential),
    Send,
    ClearChat,
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Exchange(ExchangeEvent),
    ExchangeFinished(ExchangeResult),
}

/// A chat controller, which owns the transcript and the session state and
/// serializes every intent that changes them.
///
/// Intents are handled one at a time by a dedicated task, in the order
/// they were issued. The controller runs at most one exchange with the
/// backend: a send issued while an exchange is in flight is discarded.
///
/// Cloning the controller yields another handle to the same session.
#[derive(Clone)]
pub struct ChatController {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl ChatController {
    /// Replaces the system prompt.
    #[inline]
    pub fn set_system_prompt<S: Into<String>>(
        &self,
        prompt: S,
    ) -> Result<(), ControllerClosedError> {
        self.dispatch(Command::SetSystemPrompt(prompt.into()))
    }

    /// Replaces the message being typed.
    #[inline]
    pub fn set_user_text<S: Into<String>>(
        &self,
        text: S,
    ) -> Result<(), ControllerClosedError> {
        self.dispatch(Command::SetUserText(text.into()))
    }

    /// Selects a model.
    #[inline]
    pub fn set_model(&self, model: ModelId) -> Result<(), ControllerClosedError> {
        self.dispatch(Command::SetModel(model))
    }

    /// Replaces the credential.
    #[inline]
    pub fn set_credential(
        &self,
        credential: Credential,
    ) -> Result<(), ControllerClosedError> {
        self.dispatch(Command::SetCredential(credential))
    }

    /// Sends the message in the form.
    ///
    /// The outcome is reported through the session state: a validation
    /// failure sets the error text, otherwise the message shows up in the
    /// transcript right away and the reply streams in after it.
    #[inline]
    pub fn send(&self) -> Result<(), ControllerClosedError> {
        self.dispatch(Command::Send)
    }

    /// Empties the transcript and clears the error and the notice.
    ///
    /// This doesn't stop an exchange in flight. Front ends should disable
    /// the action while sending, see [`SessionSnapshot::can_clear`].
    #[inline]
    pub fn clear_chat(&self) -> Result<(), ControllerClosedError> {
        self.dispatch(Command::ClearChat)
    }

    /// Returns the session state after all intents issued so far have
    /// been handled.
    pub async fn snapshot(
        &self,
    ) -> Result<SessionSnapshot, ControllerClosedError> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(Command::Snapshot(tx))?;
        rx.await.map_err(|_| ControllerClosedError)
    }

    #[inline]
    fn dispatch(&self, cmd: Command) -> Result<(), ControllerClosedError> {
        self.cmd_tx.send(cmd).map_err(|_| ControllerClosedError)
    }

    fn spawn_from_builder(builder: ChatControllerBuilder) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let state = ControllerState::from_builder(builder, cmd_tx.downgrade());
        tokio::spawn(
            run_controller(state, cmd_rx)
                .instrument(trace_span!("chat controller")),
        );
        Self { cmd_tx }
    }
}

async fn run_controller(
    mut state: ControllerState,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
) {
    debug!("started");
    // The loop ends once every handle has been dropped and no exchange is
    // holding a sender.
    while let Some(cmd) = cmd_rx.recv().await {
        trace!("received command: {cmd:?}");
        state.handle(cmd);
    }
    debug!("will terminate");
}
