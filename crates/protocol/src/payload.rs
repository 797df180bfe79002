use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The system prompt used when the caller doesn't provide one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. \
    Provide clear, accurate, and helpful responses.";

/// The models a backend can be asked to complete with.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ModelId {
    /// `gpt-4.1-mini`.
    #[default]
    #[serde(rename = "gpt-4.1-mini")]
    Gpt41Mini,
    /// `gpt-4`.
    #[serde(rename = "gpt-4")]
    Gpt4,
    /// `gpt-3.5-turbo`.
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
}

impl ModelId {
    /// All known models, in the order a picker should list them.
    pub const ALL: [ModelId; 3] =
        [ModelId::Gpt41Mini, ModelId::Gpt4, ModelId::Gpt35Turbo];

    /// Returns the wire id of the model.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Gpt41Mini => "gpt-4.1-mini",
            ModelId::Gpt4 => "gpt-4",
            ModelId::Gpt35Turbo => "gpt-3.5-turbo",
        }
    }

    /// Returns a human readable name.
    #[inline]
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelId::Gpt41Mini => "GPT-4.1 Mini",
            ModelId::Gpt4 => "GPT-4",
            ModelId::Gpt35Turbo => "GPT-3.5 Turbo",
        }
    }

    /// Returns a short description for a model picker.
    #[inline]
    pub fn description(&self) -> &'static str {
        match self {
            ModelId::Gpt41Mini => "Fast and efficient",
            ModelId::Gpt4 => "Most capable",
            ModelId::Gpt35Turbo => "Balanced performance",
        }
    }
}

impl Display for ModelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown model id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseModelIdError(String);

impl Display for ParseModelIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unknown model: {}", self.0)
    }
}

impl Error for ParseModelIdError {}

impl FromStr for ModelId {
    type Err = ParseModelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseModelIdError(s.to_owned()))
    }
}

/// A secret token passed through to the backend.
///
/// The value never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Creates a credential from the raw secret.
    #[inline]
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self(secret.into())
    }

    /// Returns the raw secret.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the secret is empty or whitespace-only.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("<deducted>")
    }
}

/// The payload of one chat exchange.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChatPayload {
    /// The instructions for the assistant.
    pub system_prompt: String,
    /// The text the user typed.
    pub user_text: String,
    /// The model to complete with.
    pub model: ModelId,
    /// The secret forwarded to the backend.
    pub credential: Credential,
}
