/// Builder for [`HttpBackendConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct HttpBackendConfigBuilder {
    base_url: Option<String>,
    chat_path: Option<String>,
    health_path: Option<String>,
}

impl HttpBackendConfigBuilder {
    /// Creates a builder with every option left to its default.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the backend, e.g. `http://localhost:8000`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets a custom path for the chat endpoint.
    #[inline]
    pub fn with_chat_path<S: Into<String>>(mut self, path: S) -> Self {
        self.chat_path = Some(path.into());
        self
    }

    /// Sets a custom path for the health endpoint.
    #[inline]
    pub fn with_health_path<S: Into<String>>(mut self, path: S) -> Self {
        self.health_path = Some(path.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> HttpBackendConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| "http://localhost:8000".to_string());
        HttpBackendConfig {
            base_url: base_url.trim_end_matches('/').to_owned(),
            chat_path: self.chat_path.unwrap_or_else(|| "/api/chat".to_string()),
            health_path: self
                .health_path
                .unwrap_or_else(|| "/api/health".to_string()),
        }
    }
}

/// Configuration for the HTTP backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpBackendConfig {
    pub(crate) base_url: String,
    pub(crate) chat_path: String,
    pub(crate) health_path: String,
}

impl HttpBackendConfig {
    #[inline]
    pub(crate) fn chat_url(&self) -> String {
        format!("{}{}", self.base_url, self.chat_path)
    }

    #[inline]
    pub(crate) fn health_url(&self) -> String {
        format!("{}{}", self.base_url, self.health_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HttpBackendConfigBuilder::new().build();
        assert_eq!(config.chat_url(), "http://localhost:8000/api/chat");
        assert_eq!(config.health_url(), "http://localhost:8000/api/health");
    }

    #[test]
    fn test_trailing_slash() {
        let config = HttpBackendConfigBuilder::new()
            .with_base_url("https://chat.example.com/")
            .with_chat_path("/v2/chat")
            .build();
        assert_eq!(config.chat_url(), "https://chat.example.com/v2/chat");
    }
}
