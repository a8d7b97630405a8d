// crates/core/src/llm/mod.rs
//! LLM integration: provider trait plus the Anthropic Messages transport.

pub mod anthropic;
pub mod provider;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use provider::LlmProvider;
pub use types::*;
