// crates/core/src/analytics/release.rs
//! Release status: per-version completion, singly or project-wide.

use redmine_copilot_types::{ReleaseInfo, ReleaseStatusReport, Snapshot, VersionRecord};

use super::round1;

/// Build the release report. A named version yields one `release` object;
/// without one, every version of the project is listed under `releases`.
pub fn release_status(
    snapshot: &Snapshot,
    project_id: i64,
    version: Option<&str>,
) -> Result<ReleaseStatusReport, String> {
    match version {
        Some(name) => {
            let version = snapshot
                .find_version(project_id, name)
                .ok_or_else(|| format!("unknown version: {name}"))?;
            Ok(ReleaseStatusReport {
                success: true,
                release: Some(release_info(snapshot, version)),
                releases: None,
            })
        }
        None => {
            let releases: Vec<ReleaseInfo> = snapshot
                .project_versions(project_id)
                .map(|v| release_info(snapshot, v))
                .collect();
            Ok(ReleaseStatusReport { success: true, release: None, releases: Some(releases) })
        }
    }
}

fn release_info(snapshot: &Snapshot, version: &VersionRecord) -> ReleaseInfo {
    let total_issues = snapshot
        .project_issues(version.project_id)
        .filter(|i| i.version_id == Some(version.id))
        .count() as u64;
    let closed_issues = snapshot
        .project_issues(version.project_id)
        .filter(|i| i.version_id == Some(version.id) && i.is_closed())
        .count() as u64;

    let completion_percentage = if total_issues == 0 {
        0.0
    } else {
        round1(closed_issues as f64 * 100.0 / total_issues as f64)
    };

    ReleaseInfo {
        version_name: version.name.clone(),
        total_issues,
        closed_issues,
        open_issues: total_issues - closed_issues,
        completion_percentage,
        due_date: version.due_date,
    }
}
