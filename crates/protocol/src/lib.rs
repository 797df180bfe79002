//! The protocol between a chat front end and a completion backend.
//!
//! This crate defines the payload a chat client sends for one exchange,
//! and the traits a transport has to implement so that the client can
//! open a request and pull the streamed reply chunk by chunk.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the backend implementors should adhere to. Decoding
//! the chunks into text is left to the consumer, since a multi-byte
//! character may be split across two chunks.

#![deny(missing_docs)]

mod backend;
mod body;
mod error;
mod payload;

pub use backend::*;
pub use body::*;
pub use error::*;
pub use payload::*;
