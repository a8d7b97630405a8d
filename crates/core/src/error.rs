// crates/core/src/error.rs
//! Error taxonomy for the gateway core.
//!
//! Each enum carries a stable machine-readable `kind()` string that tool
//! results expose alongside the human-readable message, so the renderer can
//! switch on failure classes without parsing prose.

use thiserror::Error;

/// Failures from the tracker REST surface.
#[derive(Debug, Error)]
pub enum RedmineError {
    #[error("tracker unreachable: {0}")]
    Unreachable(String),

    #[error("tracker rejected the credential")]
    Unauthorized,

    #[error("tracker denied access")]
    Forbidden,

    #[error("tracker resource not found")]
    NotFound,

    #[error("tracker rate limited")]
    RateLimited { retry_after: Option<u64> },

    #[error("tracker returned a malformed response: {0}")]
    Malformed(String),
}

impl RedmineError {
    pub fn kind(&self) -> &'static str {
        match self {
            RedmineError::Unreachable(_) => "tracker_unreachable",
            RedmineError::Unauthorized => "tracker_unauthorized",
            RedmineError::Forbidden => "tracker_forbidden",
            RedmineError::NotFound => "tracker_not_found",
            RedmineError::RateLimited { .. } => "tracker_rate_limited",
            RedmineError::Malformed(_) => "tracker_malformed",
        }
    }

    /// Transient classes worth retrying on an idempotent GET.
    pub fn is_transient(&self) -> bool {
        matches!(self, RedmineError::Unreachable(_) | RedmineError::RateLimited { .. })
    }

    /// HTTP status for partial-data markers (users endpoint 403 etc.).
    pub fn marker_status(&self) -> u16 {
        match self {
            RedmineError::Unauthorized => 401,
            RedmineError::Forbidden => 403,
            RedmineError::NotFound => 404,
            RedmineError::RateLimited { .. } => 429,
            RedmineError::Unreachable(_) => 503,
            RedmineError::Malformed(_) => 502,
        }
    }
}

/// Failures from the cache engine.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache is not initialized")]
    Unavailable,

    #[error("cache is disabled")]
    Disabled,

    #[error("cache refresh failed: {0}")]
    Refresh(String),
}

impl CacheError {
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Unavailable | CacheError::Disabled => "cache_unavailable",
            CacheError::Refresh(_) => "cache_unavailable",
        }
    }
}

/// Failures surfaced to the model as tool-role error messages.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("unknown project: {0}")]
    UnknownProject(String),

    #[error(transparent)]
    Tracker(#[from] RedmineError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::InvalidArguments { .. } => "tool_argument_invalid",
            ToolError::UnknownProject(_) => "unknown_project",
            ToolError::Tracker(e) => e.kind(),
            ToolError::Cache(e) => e.kind(),
        }
    }
}
