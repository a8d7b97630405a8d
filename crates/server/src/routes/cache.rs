// crates/server/src/routes/cache.rs
//! Cache control endpoint: on/off/refresh/status.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use redmine_copilot_core::cache::{apply_cache_action, CacheAction};
use serde::Deserialize;
use serde_json::Value;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CacheControlRequest {
    pub action: CacheAction,
}

/// POST /api/redmine-cache - drive the cache engine.
///
/// Failures (an unreachable tracker during refresh, say) come back as
/// `success: false` in the body, not as HTTP errors: the control surface
/// itself worked.
pub async fn cache_control(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CacheControlRequest>,
) -> Json<Value> {
    Json(apply_cache_action(&state.cache, request.action).await)
}

/// Create the cache control routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/redmine-cache", post(cache_control))
}
