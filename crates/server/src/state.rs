// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use redmine_copilot_core::cache::CacheEngine;
use redmine_copilot_core::chat::ChatRuntime;
use redmine_copilot_core::config::Config;
use redmine_copilot_core::llm::LlmProvider;
use redmine_copilot_core::redmine::RedmineClient;
use redmine_copilot_core::tools::{ToolExecutor, ToolRegistry};
use redmine_copilot_core::RedmineError;

/// Shared application state accessible from all route handlers.
///
/// Everything here is constructed once at startup and immutable afterwards;
/// the only mutable state is inside the cache engine (snapshot cell and
/// refresh coalescing), which manages its own synchronization.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    pub config: Arc<Config>,
    pub cache: Arc<CacheEngine>,
    pub runtime: ChatRuntime,
}

impl AppState {
    /// Wire up the full request pipeline around a provider. The provider is
    /// injected so tests can substitute a scripted one.
    pub fn new(config: Config, llm: Arc<dyn LlmProvider>) -> Result<Arc<Self>, RedmineError> {
        let config = Arc::new(config);
        let tracker = Arc::new(RedmineClient::new(
            &config.redmine_base_url,
            &config.redmine_api_key,
            config.cache_max_issues,
        )?);
        let cache = Arc::new(CacheEngine::new(Arc::clone(&tracker), config.cache_ttl));
        let registry = Arc::new(ToolRegistry::builtin());
        let executor = Arc::new(ToolExecutor::new(
            Arc::clone(&config),
            Arc::clone(&registry),
            Arc::clone(&tracker),
            Arc::clone(&cache),
        ));
        let runtime = ChatRuntime::new(llm, registry, executor);

        Ok(Arc::new(Self {
            start_time: Instant::now(),
            config,
            cache,
            runtime,
        }))
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("uptime_secs", &self.uptime_secs())
            .finish_non_exhaustive()
    }
}
