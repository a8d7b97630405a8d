// crates/server/src/lib.rs
//! Gateway server library.
//!
//! Axum-based HTTP surface for the redmine-copilot gateway: a chat endpoint
//! driving the LLM tool loop, a cache control endpoint, and health.

pub mod error;
pub mod routes;
pub mod state;

pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create a CORS layer for the configured origins.
///
/// An empty origin list restricts to localhost on any port, so a hosted page
/// cannot drive the gateway (and its tracker credential) via `fetch()`.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = if allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _req_parts: &axum::http::request::Parts| {
                if let Ok(origin) = origin.to_str() {
                    origin.starts_with("http://localhost:")
                        || origin.starts_with("http://127.0.0.1:")
                        || origin == "http://localhost"
                        || origin == "http://127.0.0.1"
                } else {
                    false
                }
            },
        ))
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };
    layer.allow_methods(Any).allow_headers(Any)
}

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (chat, cache control, health)
/// - CORS restricted to the configured origins
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    api_routes(state).layer(cors).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use redmine_copilot_core::llm::{LlmError, LlmProvider, LlmRequest, LlmResponse};
    use redmine_copilot_core::Config;

    struct NullProvider;

    #[async_trait]
    impl LlmProvider for NullProvider {
        async fn chat(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            Err(LlmError::Unavailable("null".to_string()))
        }
        fn name(&self) -> &str {
            "null"
        }
        fn model(&self) -> &str {
            "none"
        }
    }

    #[test]
    fn test_create_app() {
        let state = AppState::new(
            Config::for_tests("http://127.0.0.1:1"),
            Arc::new(NullProvider),
        )
        .unwrap();
        let _router = create_app(state);
    }
}
