//! Core logic including the transcript store, the streamed reply
//! assembler and the chat controller.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod controller;
pub mod decoder;
pub mod encoder;
pub mod error;
mod exchange;
pub mod stream;
pub mod transcript;

pub use controller::{
    ChatController, ChatControllerBuilder, ChatPhase, ControllerClosedError,
    FormState, SUCCESS_NOTICE, SessionSnapshot,
};
pub use streamchat_protocol::{Credential, DEFAULT_SYSTEM_PROMPT, ModelId};
