// crates/core/src/llm/anthropic.rs
//! Anthropic Messages API transport for the tool-call protocol.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{LlmError, LlmRequest, LlmResponse, LlmTurn, ToolChoice, ToolInvocation};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Transient failures retry this many times with doubling delay.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_millis(500);
const RETRY_CAP: Duration = Duration::from_secs(4);

/// LLM provider speaking the Anthropic Messages protocol over HTTPS.
pub struct AnthropicProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: ANTHROPIC_API_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Point the provider at a different endpoint (mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body(&self, request: &LlmRequest) -> Value {
        let messages: Vec<Value> = request.turns.iter().map(turn_to_message).collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "messages": messages,
        });
        if !request.tools.is_empty() {
            body["tools"] = json!(request.tools);
            body["tool_choice"] = match request.tool_choice {
                ToolChoice::Auto => json!({"type": "auto"}),
                ToolChoice::Required => json!({"type": "any"}),
            };
        }
        body
    }

    async fn send_once(&self, body: &Value) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(60)
                } else {
                    LlmError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if status.is_server_error() {
            return Err(LlmError::Unavailable(format!("server error {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::InvalidResponse(format!("status {status}: {detail}")));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        parse_response(&value)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.build_body(&request);
        let mut attempt = 0u32;
        loop {
            match self.send_once(&body).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                    let mut delay = RETRY_BASE * 2u32.pow(attempt);
                    if let LlmError::RateLimited { retry_after_secs: Some(secs) } = &err {
                        delay = delay.max(Duration::from_secs(*secs));
                    }
                    let delay = delay.min(RETRY_CAP);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "LLM call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn turn_to_message(turn: &LlmTurn) -> Value {
    match turn {
        LlmTurn::User(text) => json!({"role": "user", "content": text}),
        LlmTurn::Assistant { text, tool_calls } => {
            let mut blocks = Vec::new();
            if let Some(text) = text {
                if !text.is_empty() {
                    blocks.push(json!({"type": "text", "text": text}));
                }
            }
            for call in tool_calls {
                blocks.push(json!({
                    "type": "tool_use",
                    "id": call.id,
                    "name": call.name,
                    "input": call.arguments,
                }));
            }
            json!({"role": "assistant", "content": blocks})
        }
        LlmTurn::ToolResults(results) => {
            let blocks: Vec<Value> = results
                .iter()
                .map(|r| {
                    json!({
                        "type": "tool_result",
                        "tool_use_id": r.call_id,
                        "content": r.content,
                    })
                })
                .collect();
            json!({"role": "user", "content": blocks})
        }
    }
}

fn parse_response(value: &Value) -> Result<LlmResponse, LlmError> {
    let content = value
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::InvalidResponse("missing content array".to_string()))?;

    let mut text_parts: Vec<&str> = Vec::new();
    let mut tool_calls = Vec::new();
    for block in content {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    text_parts.push(text);
                }
            }
            Some("tool_use") => {
                let id = block
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| LlmError::InvalidResponse("tool_use without id".to_string()))?;
                let name = block
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| LlmError::InvalidResponse("tool_use without name".to_string()))?;
                tool_calls.push(ToolInvocation {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: block.get("input").cloned().unwrap_or(Value::Null),
                });
            }
            _ => {}
        }
    }

    let text = if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join("\n"))
    };

    Ok(LlmResponse {
        text,
        tool_calls,
        stop_reason: value
            .get("stop_reason")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{ToolOutcome, ToolSpec};

    fn request_with_tools() -> LlmRequest {
        LlmRequest {
            system: "answer tracker questions".to_string(),
            turns: vec![LlmTurn::User("how many open bugs".to_string())],
            tools: vec![ToolSpec {
                name: "bug_analytics".to_string(),
                description: "Bug metrics".to_string(),
                input_schema: serde_json::json!({"type": "object", "properties": {}}),
            }],
            tool_choice: ToolChoice::Auto,
            max_tokens: 1024,
        }
    }

    #[test]
    fn test_body_includes_tools_and_choice() {
        let provider = AnthropicProvider::new("k", "claude-3-5-sonnet-latest").unwrap();
        let body = provider.build_body(&request_with_tools());
        assert_eq!(body["tools"][0]["name"], "bug_analytics");
        assert_eq!(body["tool_choice"]["type"], "auto");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_required_choice_maps_to_any() {
        let provider = AnthropicProvider::new("k", "m").unwrap();
        let mut request = request_with_tools();
        request.tool_choice = ToolChoice::Required;
        let body = provider.build_body(&request);
        assert_eq!(body["tool_choice"]["type"], "any");
    }

    #[test]
    fn test_tools_omitted_when_empty() {
        let provider = AnthropicProvider::new("k", "m").unwrap();
        let mut request = request_with_tools();
        request.tools.clear();
        let body = provider.build_body(&request);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_tool_results_become_user_message() {
        let turn = LlmTurn::ToolResults(vec![ToolOutcome {
            call_id: "toolu_1".to_string(),
            name: "bug_analytics".to_string(),
            content: "{\"success\":true}".to_string(),
        }]);
        let msg = turn_to_message(&turn);
        assert_eq!(msg["role"], "user");
        assert_eq!(msg["content"][0]["type"], "tool_result");
        assert_eq!(msg["content"][0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn test_parse_response_mixed_content() {
        let value = serde_json::json!({
            "content": [
                {"type": "text", "text": "Checking."},
                {"type": "tool_use", "id": "toolu_1", "name": "bug_analytics",
                 "input": {"project_id": "ncel"}}
            ],
            "stop_reason": "tool_use"
        });
        let response = parse_response(&value).unwrap();
        assert_eq!(response.text.as_deref(), Some("Checking."));
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "bug_analytics");
        assert_eq!(response.stop_reason.as_deref(), Some("tool_use"));
    }

    #[test]
    fn test_parse_response_missing_content_is_invalid() {
        let err = parse_response(&serde_json::json!({"id": "msg_1"})).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }
}
