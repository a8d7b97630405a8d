// crates/core/src/llm/types.rs
//! Request/response/error types for the LLM tool-call protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A tool definition as exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A structured tool invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// The result of executing one tool call, fed back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub call_id: String,
    pub name: String,
    /// JSON text, exactly what the renderer will eventually see.
    pub content: String,
}

/// One turn in a provider conversation.
///
/// Tool results are grouped into their own turn because the wire protocol
/// wants them delivered together in the message that follows the assistant
/// turn which issued the calls.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmTurn {
    User(String),
    Assistant {
        text: Option<String>,
        tool_calls: Vec<ToolInvocation>,
    },
    ToolResults(Vec<ToolOutcome>),
}

/// Whether the model may answer in prose or must call a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    Required,
}

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub turns: Vec<LlmTurn>,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: ToolChoice,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
    pub stop_reason: Option<String>,
}

impl LlmResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Errors from the LLM transport.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM unavailable: {0}")]
    Unavailable(String),

    #[error("LLM rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("LLM returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("LLM call timed out after {0} seconds")]
    Timeout(u64),
}

impl LlmError {
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::RateLimited { .. } => "llm_rate_limited",
            LlmError::Timeout(_) => "deadline_exceeded",
            LlmError::Unavailable(_) | LlmError::InvalidResponse(_) => "llm_unavailable",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Unavailable(_) | LlmError::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_spec_wire_shape() {
        let spec = ToolSpec {
            name: "bug_analytics".to_string(),
            description: "Bug metrics for a project".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"project_id": {"type": ["integer", "string"]}},
                "required": ["project_id"]
            }),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["name"], "bug_analytics");
        assert_eq!(json["input_schema"]["type"], "object");
    }

    #[test]
    fn test_llm_error_kinds() {
        assert_eq!(LlmError::RateLimited { retry_after_secs: None }.kind(), "llm_rate_limited");
        assert_eq!(LlmError::Timeout(30).kind(), "deadline_exceeded");
        assert_eq!(LlmError::Unavailable("529".into()).kind(), "llm_unavailable");
    }

    #[test]
    fn test_response_has_tool_calls() {
        let response = LlmResponse {
            text: None,
            tool_calls: vec![ToolInvocation {
                id: "toolu_1".to_string(),
                name: "bug_analytics".to_string(),
                arguments: serde_json::json!({"project_id": "ncel"}),
            }],
            stop_reason: Some("tool_use".to_string()),
        };
        assert!(response.has_tool_calls());
    }
}
