// crates/core/src/llm/provider.rs
//! LlmProvider trait defining the interface for LLM integrations.

use async_trait::async_trait;

use super::types::{LlmError, LlmRequest, LlmResponse};

/// Trait for LLM providers that can drive the tool-call protocol.
///
/// The production implementation is [`super::AnthropicProvider`]; tests
/// substitute scripted providers to exercise the loop deterministically.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One model round: messages + tools in, text and/or tool calls out.
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Provider name for logging (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Model identifier in use.
    fn model(&self) -> &str;
}
