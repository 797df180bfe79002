use streamchat_protocol::ChatPayload;
use tokio::sync::mpsc::WeakUnboundedSender;

use super::transition::{Effect, Input, Phase, step};
use super::{
    ChatControllerBuilder, ChatPhase, Command, FormState, SessionSnapshot,
};
use crate::encoder::encode_request;
use crate::exchange::{ExchangeClient, ExchangeEvent};
use crate::transcript::{Message, Role, Transcript};

/// Records created for an input, which are only inserted if the
/// transition table asks for it.
#[derive(Default)]
struct Staged {
    user: Option<Message>,
    payload: Option<ChatPayload>,
    assistant: Option<Message>,
}

pub struct ControllerState {
    client: ExchangeClient,
    transcript: Transcript,
    phase: Phase,
    form: FormState,
    last_error: Option<String>,
    last_notice: Option<String>,
    cmd_tx: WeakUnboundedSender<Command>,

    on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ControllerState {
    pub fn from_builder(
        builder: ChatControllerBuilder,
        cmd_tx: WeakUnboundedSender<Command>,
    ) -> Self {
        let ChatControllerBuilder {
            client,
            form,
            on_idle,
            observers,
        } = builder;

        let mut transcript = Transcript::new();
        for observer in observers {
            transcript.observe(observer);
        }
        Self {
            client,
            transcript,
            phase: Phase::Idle,
            form,
            last_error: None,
            last_notice: None,
            cmd_tx,
            on_idle,
        }
    }

    pub fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::SetSystemPrompt(prompt) => self.form.system_prompt = prompt,
            Command::SetUserText(text) => self.form.user_text = text,
            Command::SetModel(model) => self.form.model = model,
            Command::SetCredential(credential) => {
                self.form.credential = credential
            }
            Command::Send => self.send(),
            Command::ClearChat => {
                self.advance(Input::Clear, Staged::default());
            }
            Command::Snapshot(tx) => {
                tx.send(self.snapshot()).ok();
            }
            Command::Exchange(ExchangeEvent::Opened) => {
                let assistant =
                    self.transcript.new_streaming_record(Role::Assistant);
                let input = Input::Opened {
                    assistant: assistant.id(),
                };
                self.advance(
                    input,
                    Staged {
                        assistant: Some(assistant),
                        ..Default::default()
                    },
                );
            }
            Command::Exchange(ExchangeEvent::Fragment(fragment)) => {
                self.advance(Input::Fragment(fragment), Staged::default());
            }
            Command::ExchangeFinished(result) => {
                self.advance(Input::Finished(result), Staged::default());
            }
        }
    }

    fn send(&mut self) {
        let FormState {
            system_prompt,
            user_text,
            model,
            credential,
        } = &self.form;
        let mut staged = Staged::default();
        let input =
            match encode_request(system_prompt, user_text, *model, credential) {
                Ok(payload) => {
                    let user =
                        self.transcript.new_record(Role::User, user_text.clone());
                    let input = Input::Submit { user: user.id() };
                    staged.user = Some(user);
                    staged.payload = Some(payload);
                    input
                }
                Err(err) => Input::Invalid(err),
            };
        self.advance(input, staged);
    }

    fn advance(&mut self, input: Input, mut staged: Staged) {
        let step = step(self.phase, input);
        if step.next != self.phase {
            debug!("phase {:?} -> {:?}", self.phase, step.next);
        }
        self.phase = step.next;
        for effect in step.effects {
            self.apply(effect, &mut staged);
        }
    }

    fn apply(&mut self, effect: Effect, staged: &mut Staged) {
        match effect {
            Effect::ClearStatus => {
                self.last_error = None;
                self.last_notice = None;
            }
            Effect::SetError(message) => {
                info!("surfacing error: {message}");
                self.last_error = Some(message);
            }
            Effect::SetNotice(notice) => {
                self.last_notice = Some(notice.to_owned());
            }
            Effect::AppendUser => {
                if let Some(user) = staged.user.take() {
                    self.transcript.append(user);
                }
            }
            Effect::ClearInput => self.form.user_text.clear(),
            Effect::StartExchange => {
                if let Some(payload) = staged.payload.take() {
                    self.start_exchange(payload);
                }
            }
            Effect::AppendAssistant => {
                if let Some(assistant) = staged.assistant.take() {
                    self.transcript.append(assistant);
                }
            }
            Effect::AppendFragment(id, fragment) => {
                self.transcript.append_content(id, &fragment);
            }
            Effect::Finalize(id) => {
                self.transcript.finalize(id);
            }
            Effect::RollbackUser(id) => {
                if self.transcript.remove(id).is_some() {
                    debug!("rolled back user record {id:?}");
                }
            }
            Effect::ClearTranscript => self.transcript.clear(),
            Effect::NotifyIdle => {
                if let Some(on_idle) = &self.on_idle {
                    on_idle();
                }
            }
        }
    }

    fn start_exchange(&mut self, payload: ChatPayload) {
        // Every handle is gone, nobody can observe this exchange anymore.
        let Some(cmd_tx) = self.cmd_tx.upgrade() else {
            warn!("controller is shutting down, exchange not started");
            return;
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client
                .run(payload, {
                    let cmd_tx = cmd_tx.clone();
                    move |event| {
                        cmd_tx.send(Command::Exchange(event)).ok();
                    }
                })
                .await;
            cmd_tx.send(Command::ExchangeFinished(result)).ok();
        });
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: match self.phase {
                Phase::Idle => ChatPhase::Idle,
                Phase::Sending { .. } => ChatPhase::Sending,
                Phase::Streaming { .. } => ChatPhase::Streaming,
            },
            messages: self.transcript.messages().to_vec(),
            last_error: self.last_error.clone(),
            last_notice: self.last_notice.clone(),
            form: self.form.clone(),
        }
    }
}
