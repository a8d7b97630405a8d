// crates/server/src/routes/chat.rs
//! The chat endpoint: one natural-language turn in, assistant reply plus
//! updated conversation history out.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use redmine_copilot_core::tools::EnabledCategories;
use redmine_copilot_types::ChatMessage;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    /// Category toggles; categories absent from the map stay enabled.
    #[serde(default)]
    pub enabled_tools: HashMap<String, bool>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub conversation_history: Vec<ChatMessage>,
}

/// POST /api/chat - run one turn through the category selector and the
/// bounded tool loop.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let budget = state
        .config
        .request_budget
        .saturating_sub(state.config.deadline_reserve);
    let deadline = Instant::now() + budget;

    let enabled = EnabledCategories::new(request.enabled_tools);
    let outcome = state
        .runtime
        .run(&request.message, &request.conversation_history, &enabled, deadline)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ChatResponse {
        response: outcome.response,
        conversation_history: outcome.history,
    }))
}

/// Create the chat routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_camel_case_fields() {
        let json = r#"{
            "message": "how many open bugs",
            "conversationHistory": [{"role": "user", "content": "hi"}],
            "enabledTools": {"tracker-analytics": true, "cache-control": false}
        }"#;
        let request: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.message, "how many open bugs");
        assert_eq!(request.conversation_history.len(), 1);
        assert_eq!(request.enabled_tools.get("cache-control"), Some(&false));
    }

    #[test]
    fn test_request_defaults_optional_fields() {
        let request: ChatRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert!(request.conversation_history.is_empty());
        assert!(request.enabled_tools.is_empty());
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = ChatResponse {
            response: "done".to_string(),
            conversation_history: vec![ChatMessage::user("hi")],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"conversationHistory\""));
    }
}
