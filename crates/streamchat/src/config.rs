use std::env;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use streamchat_core::{Credential, ModelId};
use streamchat_protocol::ParseModelIdError;

/// The backend used when `STREAMCHAT_BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const BASE_URL_VAR: &str = "STREAMCHAT_BASE_URL";
const API_KEY_VAR: &str = "OPENAI_API_KEY";
const MODEL_VAR: &str = "STREAMCHAT_MODEL";
const SYSTEM_PROMPT_VAR: &str = "STREAMCHAT_SYSTEM_PROMPT";

/// Settings of a chat session, usually read from the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// The base URL of the backend.
    pub base_url: String,
    /// The secret forwarded to the backend.
    pub credential: Credential,
    /// The initially selected model.
    pub model: ModelId,
    /// Overrides the default system prompt.
    pub system_prompt: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from the environment variables.
    ///
    /// `OPENAI_API_KEY` is required. `STREAMCHAT_BASE_URL`,
    /// `STREAMCHAT_MODEL` and `STREAMCHAT_SYSTEM_PROMPT` are optional.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration with a custom variable lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // Blank values count as unset.
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credential = var(API_KEY_VAR)
            .map(Credential::new)
            .ok_or(ConfigError::MissingVar(API_KEY_VAR))?;
        let model = match var(MODEL_VAR) {
            Some(model) => model
                .trim()
                .parse()
                .map_err(ConfigError::InvalidModel)?,
            None => ModelId::default(),
        };

        Ok(Self {
            base_url: var(BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            credential,
            model,
            system_prompt: var(SYSTEM_PROMPT_VAR),
        })
    }
}

/// Error returned when the configuration can't be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    MissingVar(&'static str),
    /// The model variable names an unknown model.
    InvalidModel(ParseModelIdError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(key) => {
                write!(f, "{key} environment variable is not set")
            }
            ConfigError::InvalidModel(err) => write!(f, "{MODEL_VAR}: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::MissingVar(_) => None,
            ConfigError::InvalidModel(err) => Some(err),
        }
    }
}
