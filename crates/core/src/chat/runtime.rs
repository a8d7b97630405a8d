// crates/core/src/chat/runtime.rs
//! Phase-2 bounded tool loop: expose the selected category's tools, execute
//! the model's calls, feed results back, and cap the iteration count so a
//! runaway model can never wedge a request.

use std::sync::Arc;

use redmine_copilot_types::{ChatMessage, ChatRole};
use tokio::time::Instant;

use crate::llm::{
    LlmError, LlmProvider, LlmRequest, LlmResponse, LlmTurn, ToolChoice, ToolOutcome, ToolSpec,
};
use crate::tools::{EnabledCategories, ToolExecutor, ToolRegistry};

use super::selector::select_category;

pub const MAX_ITERATIONS: usize = 3;
pub const MAX_TOOLS_PER_ITERATION: usize = 2;

/// Only this many trailing history turns are replayed to the model.
const HISTORY_TAIL: usize = 10;

const REPLY_MAX_TOKENS: u32 = 2048;

const SYSTEM_PROMPT: &str = "You answer questions about a project tracker using the provided tools. \
Prefer a single tool call that answers the question directly. \
Tool results are authoritative; repeat analytic JSON results verbatim in your answer. \
When the user asks for several analytics, call each relevant tool once. \
If a tool reports an error, tell the user what failed instead of guessing.";

const WRAP_UP_PROMPT: &str = "Tool budget exhausted. Produce the final answer now from the tool \
results above, without requesting more tools.";

const DEADLINE_REPLY: &str = "I ran out of time answering this - the tracker or model took too \
long to respond. Please try again.";

/// Result of one chat request: the assistant's final text and the updated
/// conversation history to hand back to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub response: String,
    pub history: Vec<ChatMessage>,
}

/// Drives one chat request through selection, the tool loop, and response
/// assembly. All state is request-scoped; the runtime itself is shareable.
pub struct ChatRuntime {
    llm: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    executor: Arc<ToolExecutor>,
}

impl ChatRuntime {
    pub fn new(llm: Arc<dyn LlmProvider>, registry: Arc<ToolRegistry>, executor: Arc<ToolExecutor>) -> Self {
        Self { llm, registry, executor }
    }

    /// Run the full pipeline. Fatal LLM failures (rate limits, repeated
    /// unavailability) bubble up for HTTP mapping; everything else resolves
    /// to an assistant reply.
    pub async fn run(
        &self,
        message: &str,
        history: &[ChatMessage],
        enabled: &EnabledCategories,
        deadline: Instant,
    ) -> Result<ChatOutcome, LlmError> {
        let mut out_history = history.to_vec();
        out_history.push(ChatMessage::user(message));

        let mut turns = history_to_turns(history);
        turns.push(LlmTurn::User(message.to_string()));

        let enabled_categories = enabled.enabled();
        let tools: Vec<ToolSpec> = if enabled_categories.is_empty() {
            Vec::new()
        } else {
            let selection = select_category(self.llm.as_ref(), message, &enabled_categories).await;
            tracing::info!(
                category = %selection.category,
                source = ?selection.source,
                "category selected"
            );
            self.registry
                .tools_for_category(selection.category, enabled)
                .iter()
                .map(|d| d.to_spec())
                .collect()
        };

        for iteration in 0..MAX_ITERATIONS {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Ok(self.deadline_reply(out_history));
            };

            let request = LlmRequest {
                system: SYSTEM_PROMPT.to_string(),
                turns: turns.clone(),
                tools: tools.clone(),
                tool_choice: ToolChoice::Auto,
                max_tokens: REPLY_MAX_TOKENS,
            };
            let response = match tokio::time::timeout(remaining, self.llm.chat(request)).await {
                Ok(result) => result?,
                Err(_) => return Ok(self.deadline_reply(out_history)),
            };

            if !response.has_tool_calls() {
                return Ok(finish(out_history, response));
            }

            let total = response.tool_calls.len();
            let kept: Vec<_> = response
                .tool_calls
                .into_iter()
                .take(MAX_TOOLS_PER_ITERATION)
                .collect();
            if total > kept.len() {
                tracing::warn!(
                    iteration,
                    requested = total,
                    executed = kept.len(),
                    "per-iteration tool cap applied"
                );
            }

            if let Some(text) = &response.text {
                if !text.is_empty() {
                    out_history.push(ChatMessage::assistant(text.clone()));
                }
            }
            turns.push(LlmTurn::Assistant {
                text: response.text.clone(),
                tool_calls: kept.clone(),
            });

            let mut outcomes = Vec::with_capacity(kept.len());
            for call in &kept {
                let result = match deadline.checked_duration_since(Instant::now()) {
                    Some(budget) => {
                        match tokio::time::timeout(budget, self.executor.execute(call)).await {
                            Ok(result) => result,
                            Err(_) => deadline_tool_result(),
                        }
                    }
                    None => deadline_tool_result(),
                };
                out_history.push(ChatMessage::tool(&call.id, &call.name, &result));
                outcomes.push(ToolOutcome {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    content: result,
                });
            }
            turns.push(LlmTurn::ToolResults(outcomes));
        }

        // Iteration cap reached: force a final, tool-free answer.
        turns.push(LlmTurn::User(WRAP_UP_PROMPT.to_string()));
        let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
            return Ok(self.deadline_reply(out_history));
        };
        let request = LlmRequest {
            system: SYSTEM_PROMPT.to_string(),
            turns,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
            max_tokens: REPLY_MAX_TOKENS,
        };
        let response = match tokio::time::timeout(remaining, self.llm.chat(request)).await {
            Ok(result) => result?,
            Err(_) => return Ok(self.deadline_reply(out_history)),
        };
        Ok(finish(out_history, response))
    }

    fn deadline_reply(&self, mut history: Vec<ChatMessage>) -> ChatOutcome {
        history.push(ChatMessage::assistant(DEADLINE_REPLY));
        ChatOutcome { response: DEADLINE_REPLY.to_string(), history }
    }
}

impl std::fmt::Debug for ChatRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRuntime")
            .field("provider", &self.llm.name())
            .finish_non_exhaustive()
    }
}

fn finish(mut history: Vec<ChatMessage>, response: LlmResponse) -> ChatOutcome {
    let text = response.text.unwrap_or_default();
    history.push(ChatMessage::assistant(&text));
    ChatOutcome { response: text, history }
}

fn deadline_tool_result() -> String {
    serde_json::json!({
        "success": false,
        "error": "deadline exceeded",
        "kind": "deadline_exceeded",
    })
    .to_string()
}

/// Replay the history tail as provider turns. Tool-role turns from earlier
/// requests have no matching tool_use block in the replayed transcript, so
/// they are folded into plain user-context turns instead.
fn history_to_turns(history: &[ChatMessage]) -> Vec<LlmTurn> {
    let tail_start = history.len().saturating_sub(HISTORY_TAIL);
    history[tail_start..]
        .iter()
        .map(|msg| match msg.role {
            ChatRole::User => LlmTurn::User(msg.content.clone()),
            ChatRole::Assistant => LlmTurn::Assistant {
                text: Some(msg.content.clone()),
                tool_calls: Vec::new(),
            },
            ChatRole::Tool => {
                let name = msg.name.as_deref().unwrap_or("tool");
                LlmTurn::User(format!("[{name} result] {}", msg.content))
            }
        })
        .collect()
}
