//! Builds the outbound payload from the form state.

use streamchat_protocol::{ChatPayload, Credential, ModelId};

use crate::error::ValidationError;

/// Builds the payload of one exchange.
///
/// This is the only validation gate before any network activity: the user
/// text and the credential must both contain something other than
/// whitespace. The system prompt is passed through as is.
pub fn encode_request(
    system_prompt: &str,
    user_text: &str,
    model: ModelId,
    credential: &Credential,
) -> Result<ChatPayload, ValidationError> {
    if user_text.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    if credential.is_blank() {
        return Err(ValidationError::MissingCredential);
    }
    Ok(ChatPayload {
        system_prompt: system_prompt.to_owned(),
        user_text: user_text.to_owned(),
        model,
        credential: credential.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let payload = encode_request(
            "Be brief.",
            "  What is Rust?\n",
            ModelId::Gpt4,
            &Credential::new("sk-1"),
        )
        .unwrap();
        // The text is sent untrimmed.
        assert_eq!(payload.user_text, "  What is Rust?\n");
        assert_eq!(payload.system_prompt, "Be brief.");
        assert_eq!(payload.model, ModelId::Gpt4);
        assert_eq!(payload.credential.expose(), "sk-1");
    }

    #[test]
    fn test_validation() {
        let key = Credential::new("sk-1");
        assert_eq!(
            encode_request("", " \n\t", ModelId::Gpt4, &key),
            Err(ValidationError::EmptyMessage)
        );
        assert_eq!(
            encode_request("", "Hi", ModelId::Gpt4, &Credential::new("  ")),
            Err(ValidationError::MissingCredential)
        );
        assert_eq!(
            encode_request("", "", ModelId::Gpt4, &Credential::default()),
            Err(ValidationError::EmptyMessage)
        );
        // An empty system prompt is fine.
        assert!(encode_request("", "Hi", ModelId::Gpt4, &key).is_ok());
    }
}
