//! The transition table of the chat controller.
//!
//! Sending a message is a two-phase commit over the transcript: the user
//! record is inserted tentatively, then either kept or reverted depending
//! on how the exchange turns out. The table below is pure, it only tells
//! the controller which effects to apply.

use crate::error::{FALLBACK_FAILURE_MESSAGE, ValidationError};
use crate::exchange::ExchangeResult;
use crate::transcript::MessageId;

/// The notice shown after a reply has streamed in completely.
pub const SUCCESS_NOTICE: &str = "Message sent successfully!";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Idle,
    Sending {
        user: MessageId,
    },
    Streaming {
        user: MessageId,
        assistant: MessageId,
    },
}

#[derive(Debug)]
pub enum Input {
    /// A valid send, `user` is the id of the staged user record.
    Submit { user: MessageId },
    /// A send that failed validation.
    Invalid(ValidationError),
    /// The backend confirmed the exchange, `assistant` is the id of the
    /// staged assistant record.
    Opened { assistant: MessageId },
    Fragment(String),
    Finished(ExchangeResult),
    Clear,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    ClearStatus,
    SetError(String),
    SetNotice(&'static str),
    AppendUser,
    ClearInput,
    StartExchange,
    AppendAssistant,
    AppendFragment(MessageId, String),
    Finalize(MessageId),
    RollbackUser(MessageId),
    ClearTranscript,
    NotifyIdle,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Step {
    pub next: Phase,
    pub effects: Vec<Effect>,
}

impl Step {
    #[inline]
    fn to(next: Phase, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }

    #[inline]
    fn stay(phase: Phase) -> Self {
        Self::to(phase, vec![])
    }
}

pub fn step(phase: Phase, input: Input) -> Step {
    use Effect::*;

    match (phase, input) {
        (Phase::Idle, Input::Submit { user }) => Step::to(
            Phase::Sending { user },
            vec![ClearStatus, AppendUser, ClearInput, StartExchange],
        ),
        (Phase::Idle, Input::Invalid(err)) => {
            Step::to(Phase::Idle, vec![SetError(err.to_string())])
        }
        // At most one exchange is in flight.
        (phase, Input::Submit { .. } | Input::Invalid(_)) => {
            debug!("rejected a send in phase {phase:?}");
            Step::stay(phase)
        }

        (Phase::Sending { user }, Input::Opened { assistant }) => Step::to(
            Phase::Streaming { user, assistant },
            vec![AppendAssistant],
        ),
        (Phase::Streaming { assistant, .. }, Input::Fragment(fragment)) => {
            Step::to(phase, vec![AppendFragment(assistant, fragment)])
        }

        (Phase::Streaming { assistant, .. }, Input::Finished(Ok(_))) => {
            Step::to(
                Phase::Idle,
                vec![Finalize(assistant), SetNotice(SUCCESS_NOTICE), NotifyIdle],
            )
        }
        // Partial content has been shown already, so it's kept along with
        // the user record.
        (Phase::Streaming { assistant, .. }, Input::Finished(Err(err))) => {
            Step::to(
                Phase::Idle,
                vec![Finalize(assistant), SetError(err.to_string()), NotifyIdle],
            )
        }
        // Nothing has been shown for this exchange, revert the user record.
        (Phase::Sending { user }, Input::Finished(Err(err))) => Step::to(
            Phase::Idle,
            vec![RollbackUser(user), SetError(err.to_string()), NotifyIdle],
        ),
        // An exchange always opens before it ends successfully, this is
        // only reachable with a misbehaving backend.
        (Phase::Sending { user }, Input::Finished(Ok(_))) => {
            warn!("exchange ended without being opened");
            Step::to(
                Phase::Idle,
                vec![
                    RollbackUser(user),
                    SetError(FALLBACK_FAILURE_MESSAGE.to_owned()),
                    NotifyIdle,
                ],
            )
        }

        (phase, Input::Clear) => {
            Step::to(phase, vec![ClearTranscript, ClearStatus])
        }

        (phase, input) => {
            debug!("ignored {input:?} in phase {phase:?}");
            Step::stay(phase)
        }
    }
}
