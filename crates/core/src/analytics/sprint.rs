// crates/core/src/analytics/sprint.rs
//! Sprint status: committed/completed/blocked breakdown for one version.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use redmine_copilot_types::{
    IssueRecord, Snapshot, SprintInfo, SprintMetrics, SprintStatusReport, VersionRecord,
    VersionStatus,
};

use super::round1;

/// Compute sprint status for a project. When `version` is absent the
/// current sprint is inferred: the open version with the nearest upcoming
/// due date, falling back to the most recently due open version.
pub fn sprint_status(
    snapshot: &Snapshot,
    project_id: i64,
    version: Option<&str>,
    blocked_status: &str,
    today: NaiveDate,
) -> SprintStatusReport {
    let resolved: Option<&VersionRecord> = match version {
        Some(name) => snapshot.find_version(project_id, name),
        None => current_sprint(snapshot, project_id, today),
    };

    // The base set matches by version name so a sprint that fell out of the
    // version table (or was named directly) still aggregates.
    let sprint_name: Option<String> = match (version, resolved) {
        (Some(name), _) => Some(name.to_string()),
        (None, Some(v)) => Some(v.name.clone()),
        (None, None) => None,
    };

    let base: Vec<&IssueRecord> = snapshot
        .project_issues(project_id)
        .filter(|i| match (&sprint_name, resolved) {
            (_, Some(v)) => i.version_id == Some(v.id),
            (Some(name), None) => i.version_name.as_deref() == Some(name.as_str()),
            (None, None) => false,
        })
        .collect();

    let committed = base.len() as u64;
    let completed = base.iter().filter(|i| i.is_closed()).count() as u64;
    let in_progress = base.iter().filter(|i| i.status_name == "in_progress").count() as u64;
    let blocked = base.iter().filter(|i| i.status_name == blocked_status).count() as u64;

    let completion_pct = if committed == 0 {
        0.0
    } else {
        round1(completed as f64 * 100.0 / committed as f64)
    };

    let mut breakdown_by_status: BTreeMap<String, u64> = BTreeMap::new();
    for issue in &base {
        *breakdown_by_status.entry(issue.status_name.clone()).or_insert(0) += 1;
    }

    let burndown_assessment = if completion_pct >= 50.0 { "on_track" } else { "behind" };

    SprintStatusReport {
        success: true,
        sprint: SprintInfo {
            name: sprint_name,
            due_date: resolved.and_then(|v| v.due_date),
        },
        metrics: SprintMetrics {
            committed,
            completed,
            in_progress,
            blocked,
            remaining: committed - completed,
            completion_pct,
            total_estimated_hours: base.iter().filter_map(|i| i.estimated_hours).sum(),
            total_spent_hours: base.iter().filter_map(|i| i.spent_hours).sum(),
            breakdown_by_status,
            burndown_assessment: burndown_assessment.to_string(),
        },
    }
}

fn current_sprint(snapshot: &Snapshot, project_id: i64, today: NaiveDate) -> Option<&VersionRecord> {
    let open: Vec<&VersionRecord> = snapshot
        .project_versions(project_id)
        .filter(|v| v.status == VersionStatus::Open)
        .collect();

    let upcoming = open
        .iter()
        .copied()
        .filter(|v| v.due_date.is_some_and(|d| d >= today))
        .min_by_key(|v| v.due_date);
    if upcoming.is_some() {
        return upcoming;
    }
    let most_recent = open
        .iter()
        .copied()
        .filter(|v| v.due_date.is_some())
        .max_by_key(|v| v.due_date);
    if most_recent.is_some() {
        return most_recent;
    }
    open.first().copied()
}
