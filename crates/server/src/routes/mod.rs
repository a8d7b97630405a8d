// crates/server/src/routes/mod.rs
//! API route handlers for the gateway server.

pub mod cache;
pub mod chat;
pub mod health;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - POST /api/chat - one conversational turn through the tool loop
/// - POST /api/redmine-cache - cache control (on/off/refresh/status)
/// - GET /api/health - health check
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", chat::router())
        .nest("/api", cache::router())
        .with_state(state)
}
