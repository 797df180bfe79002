use serde::{Deserialize, Serialize};
use streamchat_protocol::{ChatPayload, ModelId};

/// The JSON body of `POST /api/chat`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub developer_message: &'a str,
    pub user_message: &'a str,
    pub model: ModelId,
    pub api_key: &'a str,
}

/// The JSON body of `GET /api/health`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

pub fn create_request(payload: &ChatPayload) -> ChatRequest<'_> {
    ChatRequest {
        developer_message: &payload.system_prompt,
        user_message: &payload.user_text,
        model: payload.model,
        api_key: payload.credential.expose(),
    }
}
