// crates/core/src/chat/selector.rs
//! Phase-1 category selection: a keyword prefilter, then a single bounded
//! model round, then a fallback. This stage never fails the request.

use serde_json::json;

use crate::llm::{LlmProvider, LlmRequest, LlmTurn, ToolChoice, ToolSpec};
use crate::tools::ToolCategory;

/// Token cap for the selection round; one enum value needs very few.
const SELECTOR_MAX_TOKENS: u32 = 100;

const SELECTOR_SYSTEM_PROMPT: &str = "You route a tracker question to one tool category. \
Call select_category exactly once with the best-fitting category.";

/// Distinguishing terms per category, checked before spending a model round.
const ANALYTICS_TERMS: &[&str] = &[
    "sprint", "backlog", "bug", "velocity", "throughput", "workload", "cycle", "release",
    "blocked", "burndown", "lead time",
];
const CACHE_TERMS: &[&str] = &["cache"];
const CORE_TERMS: &[&str] = &["issue", "ticket", "project", "version", "assigned"];

/// How the category was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    Keyword,
    Model,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct CategorySelection {
    pub category: ToolCategory,
    pub source: SelectionSource,
    pub reasoning: Option<String>,
}

/// Pick exactly one category for the utterance out of `enabled` (must be
/// non-empty; the caller short-circuits an all-disabled request earlier).
pub async fn select_category(
    llm: &dyn LlmProvider,
    utterance: &str,
    enabled: &[ToolCategory],
) -> CategorySelection {
    if let Some(category) = keyword_match(utterance, enabled) {
        tracing::debug!(category = %category, "category selected by keyword");
        return CategorySelection {
            category,
            source: SelectionSource::Keyword,
            reasoning: None,
        };
    }

    match model_round(llm, utterance, enabled).await {
        Some(selection) => selection,
        None => {
            let category = enabled[0];
            tracing::debug!(category = %category, "category selection fell back");
            CategorySelection {
                category,
                source: SelectionSource::Fallback,
                reasoning: None,
            }
        }
    }
}

fn keyword_match(utterance: &str, enabled: &[ToolCategory]) -> Option<ToolCategory> {
    let text = utterance.to_lowercase();
    let hit = |terms: &[&str]| terms.iter().any(|t| text.contains(t));

    // Cache control first: "refresh the cache" also mentions nothing else.
    let ordered = [
        (ToolCategory::CacheControl, CACHE_TERMS),
        (ToolCategory::TrackerAnalytics, ANALYTICS_TERMS),
        (ToolCategory::TrackerCore, CORE_TERMS),
    ];
    ordered
        .into_iter()
        .find(|(category, terms)| enabled.contains(category) && hit(terms))
        .map(|(category, _)| category)
}

async fn model_round(
    llm: &dyn LlmProvider,
    utterance: &str,
    enabled: &[ToolCategory],
) -> Option<CategorySelection> {
    let names: Vec<&str> = enabled.iter().map(|c| c.as_str()).collect();
    let meta_tool = ToolSpec {
        name: "select_category".to_string(),
        description: "Select the tool category that best fits the user's question.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "category": {"type": "string", "enum": names},
                "reasoning": {"type": "string"}
            },
            "required": ["category"]
        }),
    };

    let request = LlmRequest {
        system: SELECTOR_SYSTEM_PROMPT.to_string(),
        turns: vec![LlmTurn::User(utterance.to_string())],
        tools: vec![meta_tool],
        tool_choice: ToolChoice::Required,
        max_tokens: SELECTOR_MAX_TOKENS,
    };

    let response = match llm.chat(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "category selection round failed");
            return None;
        }
    };

    let call = response
        .tool_calls
        .iter()
        .find(|c| c.name == "select_category")?;
    let name = call.arguments.get("category")?.as_str()?;
    let category = ToolCategory::parse(name).filter(|c| enabled.contains(c))?;

    Some(CategorySelection {
        category,
        source: SelectionSource::Model,
        reasoning: call
            .arguments
            .get("reasoning")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}
