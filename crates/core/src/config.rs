// crates/core/src/config.rs
//! Environment-driven configuration and identifier resolution.
//!
//! The enum maps (project aliases, status/tracker/priority names) are
//! compiled in for the known tracker deployment and overridable at
//! construction so tests and other deployments can substitute their own.

use std::collections::HashMap;
use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl ConfigError {
    pub fn kind(&self) -> &'static str {
        "configuration_missing"
    }
}

/// A project named either by tracker id or by slug/display name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProjectIdent {
    Id(i64),
    Name(String),
}

impl std::fmt::Display for ProjectIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectIdent::Id(id) => write!(f, "{id}"),
            ProjectIdent::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Closed name→id maps for the known deployment.
#[derive(Debug, Clone)]
pub struct EnumMaps {
    /// Lowercased slug/display-name aliases.
    pub projects: HashMap<String, i64>,
    pub statuses: HashMap<String, i64>,
    pub trackers: HashMap<String, i64>,
    pub priorities: HashMap<String, i64>,
}

impl Default for EnumMaps {
    fn default() -> Self {
        let projects = HashMap::from([("ncel".to_string(), 6)]);
        let statuses = HashMap::from([
            ("new".to_string(), 1),
            ("in_progress".to_string(), 2),
            ("resolved".to_string(), 3),
            ("feedback".to_string(), 4),
            ("closed".to_string(), 5),
            ("rejected".to_string(), 6),
            ("backlog".to_string(), 7),
            ("cancelled".to_string(), 8),
        ]);
        let trackers = HashMap::from([
            ("bug".to_string(), 1),
            ("feature".to_string(), 2),
            ("support".to_string(), 3),
            ("story".to_string(), 4),
        ]);
        let priorities = HashMap::from([
            ("low".to_string(), 1),
            ("normal".to_string(), 2),
            ("high".to_string(), 3),
            ("urgent".to_string(), 4),
            ("immediate".to_string(), 5),
        ]);
        Self { projects, statuses, trackers, priorities }
    }
}

/// Gateway configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub redmine_base_url: String,
    pub redmine_api_key: String,
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub port: u16,
    pub cache_ttl: Duration,
    pub cache_max_issues: usize,
    /// Empty list = localhost-only origin predicate.
    pub allowed_origins: Vec<String>,
    /// Status name treated as the "blocked" marker (installation-specific).
    pub blocked_status: String,
    /// Open-issue count above which a member counts as overloaded.
    pub overload_threshold: u64,
    /// Whole-request budget; the 2 s reserve is subtracted for deadlines.
    pub request_budget: Duration,
    pub deadline_reserve: Duration,
    /// Fixed UTC offset for calendar-based reports (month, ISO week).
    pub report_offset: FixedOffset,
    pub enums: EnumMaps,
}

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
const DEFAULT_CACHE_MAX_ISSUES: usize = 1000;
const DEFAULT_REQUEST_BUDGET_SECONDS: u64 = 55;
const DEFAULT_LLM_MODEL: &str = "claude-3-5-sonnet-latest";

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Missing required variables abort startup; every optional variable has
    /// a documented default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let redmine_base_url = required("REDMINE_BASE_URL")?;
        let redmine_api_key = required("REDMINE_API_KEY")?;
        let anthropic_api_key = required("ANTHROPIC_API_KEY")?;

        let port = parsed("PORT", DEFAULT_PORT)?;
        let ttl_seconds = parsed("CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)?;
        let cache_max_issues = parsed("CACHE_MAX_ISSUES", DEFAULT_CACHE_MAX_ISSUES)?;
        let budget_seconds = parsed("REQUEST_BUDGET_SECONDS", DEFAULT_REQUEST_BUDGET_SECONDS)?;
        let offset_minutes: i32 = parsed("REPORT_UTC_OFFSET_MINUTES", 0)?;

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let report_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or(ConfigError::Invalid {
            name: "REPORT_UTC_OFFSET_MINUTES",
            value: offset_minutes.to_string(),
        })?;

        Ok(Self {
            redmine_base_url: redmine_base_url.trim_end_matches('/').to_string(),
            redmine_api_key,
            anthropic_api_key,
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            port,
            cache_ttl: Duration::from_secs(ttl_seconds),
            cache_max_issues,
            allowed_origins,
            blocked_status: std::env::var("BLOCKED_STATUS").unwrap_or_else(|_| "feedback".to_string()),
            overload_threshold: parsed("OVERLOAD_THRESHOLD", 10)?,
            request_budget: Duration::from_secs(budget_seconds),
            deadline_reserve: Duration::from_secs(2),
            report_offset,
            enums: EnumMaps::default(),
        })
    }

    /// Resolve a project identifier to the tracker id. Unknown names return
    /// `None`, which callers turn into an `unknown project` tool failure.
    pub fn normalize_project_id(&self, ident: &ProjectIdent) -> Option<i64> {
        match ident {
            ProjectIdent::Id(id) => Some(*id),
            ProjectIdent::Name(name) => {
                let key = name.trim().to_lowercase();
                // Numeric strings pass through like integer ids.
                if let Ok(id) = key.parse::<i64>() {
                    return Some(id);
                }
                self.enums.projects.get(&key).copied()
            }
        }
    }

    pub fn status_id(&self, name: &str) -> Option<i64> {
        self.enums.statuses.get(&name.to_lowercase()).copied()
    }

    pub fn tracker_id(&self, name: &str) -> Option<i64> {
        self.enums.trackers.get(&name.to_lowercase()).copied()
    }

    pub fn priority_id(&self, name: &str) -> Option<i64> {
        self.enums.priorities.get(&name.to_lowercase()).copied()
    }

    /// Status ids in the closed partition, for journal transition checks.
    pub fn closed_status_ids(&self) -> Vec<i64> {
        redmine_copilot_types::CLOSED_STATUSES
            .iter()
            .filter_map(|name| self.status_id(name))
            .collect()
    }

    /// A config suitable for tests: fixed maps, no environment reads.
    pub fn for_tests(redmine_base_url: impl Into<String>) -> Self {
        Self {
            redmine_base_url: redmine_base_url.into(),
            redmine_api_key: "test-key".to_string(),
            anthropic_api_key: "test-key".to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            port: 0,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            cache_max_issues: DEFAULT_CACHE_MAX_ISSUES,
            allowed_origins: Vec::new(),
            blocked_status: "feedback".to_string(),
            overload_threshold: 10,
            request_budget: Duration::from_secs(DEFAULT_REQUEST_BUDGET_SECONDS),
            deadline_reserve: Duration::from_secs(2),
            report_offset: FixedOffset::east_opt(0).unwrap(),
            enums: EnumMaps::default(),
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
