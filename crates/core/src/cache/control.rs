// crates/core/src/cache/control.rs
//! The cache control surface: one action enum shared by the HTTP endpoint
//! and the `cache_control` tool, producing the documented JSON shape.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::engine::{CacheEngine, CacheStatus};

/// Actions accepted by the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheAction {
    On,
    Off,
    Refresh,
    Status,
}

/// Apply a control action and produce the response JSON.
pub async fn apply_cache_action(engine: &Arc<CacheEngine>, action: CacheAction) -> Value {
    match action {
        CacheAction::On => match engine.enable().await {
            Ok(()) => json!({
                "success": true,
                "status": "enabled",
                "cache_info": cache_info_json(&engine.status()),
            }),
            Err(e) => json!({
                "success": false,
                "error": e.to_string(),
                "status": "enabled",
                "cache_info": cache_info_json(&engine.status()),
            }),
        },
        CacheAction::Off => {
            engine.disable();
            json!({"success": true, "status": "disabled"})
        }
        CacheAction::Refresh => match engine.refresh().await {
            Ok(()) => json!({
                "success": true,
                "cache_info": cache_info_json(&engine.status()),
            }),
            Err(e) => json!({
                "success": false,
                "error": e.to_string(),
                "cache_info": cache_info_json(&engine.status()),
            }),
        },
        CacheAction::Status => {
            let status = engine.status();
            json!({
                "success": true,
                "status": if status.enabled { "enabled" } else { "disabled" },
                "cache_info": cache_info_json(&status),
            })
        }
    }
}

/// The `cache_info` object of the control contract.
pub fn cache_info_json(status: &CacheStatus) -> Value {
    let mut info = json!({
        "initialized": status.initialized,
        "last_updated": status.last_updated,
        "age_seconds": status.age_seconds,
        "counts": status.counts,
        "issues_truncated": status.issues_truncated,
    });
    if !status.endpoint_errors.is_empty() {
        info["endpoint_errors"] = json!(status.endpoint_errors);
    }
    info
}
