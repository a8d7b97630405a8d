// crates/core/src/analytics/counts.rs
//! Small status counts over the snapshot plus the direct-count helpers
//! that query the tracker with `limit=1` for exact live cardinalities.

use redmine_copilot_types::Snapshot;

use crate::config::Config;
use crate::error::{RedmineError, ToolError};
use crate::redmine::{IssueFilters, RedmineClient, StatusFilter};

/// Open issues currently in progress.
pub fn tasks_in_progress(snapshot: &Snapshot, project_id: i64) -> u64 {
    snapshot
        .project_issues(project_id)
        .filter(|i| i.is_open() && i.status_name == "in_progress")
        .count() as u64
}

/// Open issues sitting in the blocked status (installation-specific marker,
/// `feedback` by default).
pub fn blocked_tasks(snapshot: &Snapshot, project_id: i64, blocked_status: &str) -> u64 {
    snapshot
        .project_issues(project_id)
        .filter(|i| i.is_open() && i.status_name == blocked_status)
        .count() as u64
}

/// Which status partition a direct count covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountScope {
    Open,
    Closed,
    All,
}

impl CountScope {
    fn status_filter(self) -> StatusFilter {
        match self {
            CountScope::Open => StatusFilter::Open,
            CountScope::Closed => StatusFilter::Closed,
            CountScope::All => StatusFilter::All,
        }
    }
}

/// Exact live bug count, bypassing the cache and its truncation cap.
pub async fn direct_bug_count(
    client: &RedmineClient,
    config: &Config,
    project_id: i64,
    scope: CountScope,
) -> Result<u64, ToolError> {
    let tracker_id = config
        .tracker_id("bug")
        .ok_or_else(|| RedmineError::Malformed("bug tracker not configured".to_string()))?;
    let filters = IssueFilters::project(project_id)
        .with_tracker(tracker_id)
        .with_status(scope.status_filter());
    Ok(client.count_issues(&filters).await?)
}

/// Exact live issue count for one sprint (version).
pub async fn direct_sprint_count(
    client: &RedmineClient,
    project_id: i64,
    version_id: i64,
) -> Result<u64, ToolError> {
    let filters = IssueFilters::project(project_id)
        .with_version(version_id)
        .with_status(StatusFilter::All);
    Ok(client.count_issues(&filters).await?)
}

/// Exact live count of open issues in a project (the backlog total).
pub async fn direct_backlog_count(client: &RedmineClient, project_id: i64) -> Result<u64, ToolError> {
    let filters = IssueFilters::project(project_id).with_status(StatusFilter::Open);
    Ok(client.count_issues(&filters).await?)
}
