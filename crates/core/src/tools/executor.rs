// crates/core/src/tools/executor.rs
//! Synchronous dispatch of model-issued tool calls.
//!
//! Every call resolves to a JSON string. Failures (unknown tool, bad
//! arguments, unknown project, tracker or cache trouble) become
//! `{"success": false, "error": …, "kind": …}` tool messages so the model
//! can recover inside the loop instead of surfacing an HTTP error.

use std::sync::Arc;

use chrono::Utc;
use redmine_copilot_types::Snapshot;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::analytics::counts::CountScope;
use crate::analytics::{backlog, bugs, counts, cycle_time, release, sprint, throughput, velocity, workload};
use crate::cache::{apply_cache_action, CacheAction, CacheEngine};
use crate::config::{Config, ProjectIdent};
use crate::error::{CacheError, ToolError};
use crate::llm::ToolInvocation;
use crate::redmine::{IssueFilters, RedmineClient, StatusFilter};
use crate::tools::ToolRegistry;

/// Default and maximum page size for the issue listing tool.
const LIST_DEFAULT_LIMIT: u64 = 25;

pub struct ToolExecutor {
    config: Arc<Config>,
    registry: Arc<ToolRegistry>,
    tracker: Arc<RedmineClient>,
    cache: Arc<CacheEngine>,
}

impl ToolExecutor {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ToolRegistry>,
        tracker: Arc<RedmineClient>,
        cache: Arc<CacheEngine>,
    ) -> Self {
        Self { config, registry, tracker, cache }
    }

    /// Execute one tool call, always yielding a JSON tool message.
    pub async fn execute(&self, call: &ToolInvocation) -> String {
        match self.dispatch(call).await {
            Ok(value) => value.to_string(),
            Err(err) => {
                tracing::warn!(tool = %call.name, error = %err, "tool call failed");
                json!({
                    "success": false,
                    "error": err.to_string(),
                    "kind": err.kind(),
                })
                .to_string()
            }
        }
    }

    async fn dispatch(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        if self.registry.get(&call.name).is_none() {
            return Err(ToolError::UnknownTool(call.name.clone()));
        }
        match call.name.as_str() {
            // tracker-core
            "list_issues" => self.list_issues(call).await,
            "get_issue" => self.get_issue(call).await,
            "list_projects" => self.list_projects().await,
            "list_versions" => self.list_versions(call).await,
            // tracker-analytics, snapshot-backed
            "sprint_status" => self.sprint_status(call).await,
            "backlog_analytics" => self.backlog_analytics(call).await,
            "team_workload" => self.team_workload(call).await,
            "cycle_time" => self.cycle_time(call).await,
            "bug_analytics" => self.bug_analytics(call).await,
            "release_status" => self.release_status(call).await,
            "velocity_trend" => self.velocity_trend(call).await,
            "throughput" => self.throughput(call).await,
            "tasks_in_progress" => self.tasks_in_progress(call).await,
            "blocked_tasks" => self.blocked_tasks(call).await,
            // tracker-analytics, direct counts
            "get_bug_count" => self.get_bug_count(call).await,
            "get_sprint_issue_count" => self.get_sprint_issue_count(call).await,
            "get_backlog_count" => self.get_backlog_count(call).await,
            // cache-control
            "cache_control" => self.cache_control(call).await,
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    fn parse_args<T: DeserializeOwned>(&self, call: &ToolInvocation) -> Result<T, ToolError> {
        let value = if call.arguments.is_null() {
            json!({})
        } else {
            call.arguments.clone()
        };
        serde_json::from_value(value).map_err(|e| ToolError::InvalidArguments {
            tool: call.name.clone(),
            message: e.to_string(),
        })
    }

    fn resolve_project(&self, ident: &ProjectIdent) -> Result<i64, ToolError> {
        self.config
            .normalize_project_id(ident)
            .ok_or_else(|| ToolError::UnknownProject(ident.to_string()))
    }

    /// Snapshot for an aggregation. A disabled cache is brought up on
    /// demand; a stale one is served as-is while a background refresh runs.
    async fn snapshot(&self) -> Result<Arc<Snapshot>, ToolError> {
        if !self.cache.is_enabled() {
            self.cache.enable().await?;
        }
        match self.cache.read() {
            Ok(snapshot) => Ok(snapshot),
            Err(CacheError::Unavailable) => {
                // Enabled but never initialized: one more refresh attempt
                // before giving up.
                self.cache.refresh().await?;
                Ok(self.cache.read()?)
            }
            Err(e) => Err(e.into()),
        }
    }

    // ── tracker-core ────────────────────────────────────────────────────

    async fn list_issues(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        #[derive(serde::Deserialize)]
        struct Args {
            project_id: ProjectIdent,
            status: Option<String>,
            tracker: Option<String>,
            priority: Option<String>,
            assigned_to_id: Option<i64>,
            version: Option<String>,
            limit: Option<u64>,
        }
        let args: Args = self.parse_args(call)?;
        let project_id = self.resolve_project(&args.project_id)?;

        let mut filters = IssueFilters::project(project_id);
        filters.status = match args.status.as_deref() {
            None => Some(StatusFilter::All),
            Some("open") => Some(StatusFilter::Open),
            Some("closed") => Some(StatusFilter::Closed),
            Some("all") => Some(StatusFilter::All),
            Some(other) => {
                let id = self.config.status_id(other).ok_or_else(|| ToolError::InvalidArguments {
                    tool: call.name.clone(),
                    message: format!("unknown status: {other}"),
                })?;
                Some(StatusFilter::Id(id))
            }
        };
        if let Some(name) = &args.tracker {
            filters.tracker_id = Some(self.config.tracker_id(name).ok_or_else(|| {
                ToolError::InvalidArguments {
                    tool: call.name.clone(),
                    message: format!("unknown tracker: {name}"),
                }
            })?);
        }
        if let Some(name) = &args.priority {
            filters.priority_id = Some(self.config.priority_id(name).ok_or_else(|| {
                ToolError::InvalidArguments {
                    tool: call.name.clone(),
                    message: format!("unknown priority: {name}"),
                }
            })?);
        }
        filters.assigned_to_id = args.assigned_to_id;
        if let Some(name) = &args.version {
            filters.fixed_version_id = Some(self.version_id(project_id, name).await?);
        }

        let limit = args.limit.unwrap_or(LIST_DEFAULT_LIMIT);
        let (issues, total_count) = self.tracker.list_issues(&filters, limit).await?;
        Ok(json!({"success": true, "issues": issues, "total_count": total_count}))
    }

    async fn get_issue(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        #[derive(serde::Deserialize)]
        struct Args {
            issue_id: i64,
        }
        let args: Args = self.parse_args(call)?;
        let (issue, _) = self.tracker.fetch_issue_with_journals(args.issue_id).await?;
        Ok(json!({"success": true, "issue": issue}))
    }

    async fn list_projects(&self) -> Result<Value, ToolError> {
        let projects = self.tracker.fetch_projects().await?;
        Ok(json!({"success": true, "projects": projects}))
    }

    async fn list_versions(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        let project_id = self.project_arg(call)?;
        let versions = self.tracker.fetch_versions(project_id).await?;
        Ok(json!({"success": true, "versions": versions}))
    }

    // ── tracker-analytics ───────────────────────────────────────────────

    async fn sprint_status(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        #[derive(serde::Deserialize)]
        struct Args {
            project_id: ProjectIdent,
            version: Option<String>,
        }
        let args: Args = self.parse_args(call)?;
        let project_id = self.resolve_project(&args.project_id)?;
        let snapshot = self.snapshot().await?;
        let today = Utc::now().with_timezone(&self.config.report_offset).date_naive();
        let report = sprint::sprint_status(
            &snapshot,
            project_id,
            args.version.as_deref(),
            &self.config.blocked_status,
            today,
        );
        Ok(serde_json::to_value(report).unwrap_or_else(|_| json!({"success": false})))
    }

    async fn backlog_analytics(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        let project_id = self.project_arg(call)?;
        let snapshot = self.snapshot().await?;
        let report =
            backlog::backlog_analytics(&snapshot, project_id, Utc::now(), self.config.report_offset);
        Ok(serde_json::to_value(report).unwrap_or_else(|_| json!({"success": false})))
    }

    async fn team_workload(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        let project_id = self.project_arg(call)?;
        let snapshot = self.snapshot().await?;
        let report = workload::team_workload(&snapshot, project_id, self.config.overload_threshold);
        Ok(serde_json::to_value(report).unwrap_or_else(|_| json!({"success": false})))
    }

    async fn cycle_time(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        let project_id = self.project_arg(call)?;
        let snapshot = self.snapshot().await?;
        let closed_ids = self.config.closed_status_ids();
        let report =
            cycle_time::cycle_time_report(&snapshot, project_id, &self.tracker, &closed_ids).await;
        Ok(serde_json::to_value(report).unwrap_or_else(|_| json!({"success": false})))
    }

    async fn bug_analytics(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        let project_id = self.project_arg(call)?;
        let snapshot = self.snapshot().await?;
        let report = bugs::bug_analytics(&snapshot, project_id);
        Ok(serde_json::to_value(report).unwrap_or_else(|_| json!({"success": false})))
    }

    async fn release_status(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        #[derive(serde::Deserialize)]
        struct Args {
            project_id: ProjectIdent,
            version: Option<String>,
        }
        let args: Args = self.parse_args(call)?;
        let project_id = self.resolve_project(&args.project_id)?;
        let snapshot = self.snapshot().await?;
        match release::release_status(&snapshot, project_id, args.version.as_deref()) {
            Ok(report) => Ok(serde_json::to_value(report).unwrap_or_else(|_| json!({"success": false}))),
            Err(message) => Ok(json!({"success": false, "error": message})),
        }
    }

    async fn velocity_trend(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        #[derive(serde::Deserialize)]
        struct Args {
            project_id: ProjectIdent,
            sprints: Option<usize>,
        }
        let args: Args = self.parse_args(call)?;
        let project_id = self.resolve_project(&args.project_id)?;
        let snapshot = self.snapshot().await?;
        let report = velocity::velocity_trend(&snapshot, project_id, args.sprints.unwrap_or(5));
        Ok(serde_json::to_value(report).unwrap_or_else(|_| json!({"success": false})))
    }

    async fn throughput(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        #[derive(serde::Deserialize)]
        struct Args {
            project_id: ProjectIdent,
            weeks: Option<usize>,
        }
        let args: Args = self.parse_args(call)?;
        let project_id = self.resolve_project(&args.project_id)?;
        let snapshot = self.snapshot().await?;
        let report = throughput::throughput(
            &snapshot,
            project_id,
            args.weeks.unwrap_or(4),
            Utc::now(),
            self.config.report_offset,
        );
        Ok(serde_json::to_value(report).unwrap_or_else(|_| json!({"success": false})))
    }

    async fn tasks_in_progress(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        let project_id = self.project_arg(call)?;
        let snapshot = self.snapshot().await?;
        let count = counts::tasks_in_progress(&snapshot, project_id);
        Ok(json!({"success": true, "in_progress_count": count}))
    }

    async fn blocked_tasks(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        let project_id = self.project_arg(call)?;
        let snapshot = self.snapshot().await?;
        let count = counts::blocked_tasks(&snapshot, project_id, &self.config.blocked_status);
        Ok(json!({"success": true, "blocked_count": count}))
    }

    // ── direct counts ───────────────────────────────────────────────────

    async fn get_bug_count(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        #[derive(serde::Deserialize)]
        struct Args {
            project_id: ProjectIdent,
            scope: Option<String>,
        }
        let args: Args = self.parse_args(call)?;
        let project_id = self.resolve_project(&args.project_id)?;
        let scope = match args.scope.as_deref() {
            None | Some("open") => CountScope::Open,
            Some("closed") => CountScope::Closed,
            Some("all") => CountScope::All,
            Some(other) => {
                return Err(ToolError::InvalidArguments {
                    tool: call.name.clone(),
                    message: format!("unknown scope: {other}"),
                })
            }
        };
        let count = counts::direct_bug_count(&self.tracker, &self.config, project_id, scope).await?;
        let key = match scope {
            CountScope::Open => "open_bugs",
            CountScope::Closed => "closed_bugs",
            CountScope::All => "total_bugs",
        };
        Ok(json!({"success": true, key: count}))
    }

    async fn get_sprint_issue_count(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        #[derive(serde::Deserialize)]
        struct Args {
            project_id: ProjectIdent,
            version: String,
        }
        let args: Args = self.parse_args(call)?;
        let project_id = self.resolve_project(&args.project_id)?;
        let version_id = self.version_id(project_id, &args.version).await?;
        let count = counts::direct_sprint_count(&self.tracker, project_id, version_id).await?;
        Ok(json!({"success": true, "version": args.version, "issue_count": count}))
    }

    async fn get_backlog_count(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        let project_id = self.project_arg(call)?;
        let count = counts::direct_backlog_count(&self.tracker, project_id).await?;
        Ok(json!({"success": true, "backlog_count": count}))
    }

    // ── cache-control ───────────────────────────────────────────────────

    async fn cache_control(&self, call: &ToolInvocation) -> Result<Value, ToolError> {
        #[derive(serde::Deserialize)]
        struct Args {
            action: CacheAction,
        }
        let args: Args = self.parse_args(call)?;
        Ok(apply_cache_action(&self.cache, args.action).await)
    }

    // ── shared helpers ──────────────────────────────────────────────────

    fn project_arg(&self, call: &ToolInvocation) -> Result<i64, ToolError> {
        #[derive(serde::Deserialize)]
        struct Args {
            project_id: ProjectIdent,
        }
        let args: Args = self.parse_args(call)?;
        self.resolve_project(&args.project_id)
    }

    /// Resolve a version name to its id via the live versions endpoint.
    async fn version_id(&self, project_id: i64, name: &str) -> Result<i64, ToolError> {
        let versions = self.tracker.fetch_versions(project_id).await?;
        versions
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.id)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: "version".to_string(),
                message: format!("unknown version: {name}"),
            })
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor").finish_non_exhaustive()
    }
}
