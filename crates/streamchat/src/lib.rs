//! A streaming chat client that assembles the chat controller and the HTTP
//! backend.
//!
//! The crate includes a CLI tool for chatting in the terminal. And you can
//! also use it as a library to drive a chat session from your own front end.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod session;

pub use config::{AppConfig, ConfigError};
pub use session::{Session, SessionBuilder};

/// Re-exports of [`streamchat_core`] crate.
pub mod core {
    pub use streamchat_core::*;
}
