// crates/core/src/analytics/velocity.rs
//! Velocity trend over recently closed sprints.

use redmine_copilot_types::{Snapshot, SprintVelocity, VelocityTrendReport, VersionRecord, VersionStatus};

use super::round1;

/// Relative change beyond which the trend counts as moving.
const TREND_THRESHOLD: f64 = 0.10;

pub fn velocity_trend(snapshot: &Snapshot, project_id: i64, sprints: usize) -> VelocityTrendReport {
    // Most recent N closed versions by due date; versions without a due date
    // cannot be ordered and are skipped.
    let mut closed: Vec<&VersionRecord> = snapshot
        .project_versions(project_id)
        .filter(|v| v.status == VersionStatus::Closed && v.due_date.is_some())
        .collect();
    closed.sort_by_key(|v| std::cmp::Reverse(v.due_date));
    closed.truncate(sprints);
    closed.reverse(); // oldest → newest

    let per_sprint: Vec<SprintVelocity> = closed
        .iter()
        .map(|version| SprintVelocity {
            version_name: version.name.clone(),
            due_date: version.due_date,
            completed_issues: snapshot
                .project_issues(project_id)
                .filter(|i| i.version_id == Some(version.id) && i.is_closed())
                .count() as u64,
        })
        .collect();

    let average_velocity = if per_sprint.is_empty() {
        0.0
    } else {
        round1(per_sprint.iter().map(|s| s.completed_issues as f64).sum::<f64>() / per_sprint.len() as f64)
    };

    let velocity_trend = trend(&per_sprint);

    VelocityTrendReport {
        success: true,
        per_sprint,
        average_velocity,
        velocity_trend: velocity_trend.to_string(),
    }
}

fn trend(per_sprint: &[SprintVelocity]) -> &'static str {
    let (Some(first), Some(last)) = (per_sprint.first(), per_sprint.last()) else {
        return "stable";
    };
    if per_sprint.len() < 2 {
        return "stable";
    }
    let first = first.completed_issues as f64;
    let last = last.completed_issues as f64;
    if first == 0.0 {
        return if last > 0.0 { "increasing" } else { "stable" };
    }
    let change = (last - first) / first;
    if change > TREND_THRESHOLD {
        "increasing"
    } else if change < -TREND_THRESHOLD {
        "decreasing"
    } else {
        "stable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::{at, date, snapshot, version, IssueBuilder, PROJECT};

    fn sprint_with_closed(id: i64, name: &str, due: (i32, u32, u32), closed_count: i64) -> (VersionRecord, Vec<redmine_copilot_types::IssueRecord>) {
        let v = version(id, name, VersionStatus::Closed, Some(date(due.0, due.1, due.2)));
        let issues = (0..closed_count)
            .map(|n| IssueBuilder::new(id * 100 + n).version(id, name).closed(at(due.0, due.1, due.2)).build())
            .collect();
        (v, issues)
    }

    #[test]
    fn test_empty_project_is_stable() {
        let snap = snapshot(Vec::new(), Vec::new());
        let report = velocity_trend(&snap, PROJECT, 5);
        assert!(report.success);
        assert!(report.per_sprint.is_empty());
        assert_eq!(report.average_velocity, 0.0);
        assert_eq!(report.velocity_trend, "stable");
    }

    #[test]
    fn test_ordering_oldest_to_newest_and_average() {
        let (v1, i1) = sprint_with_closed(1, "S1", (2025, 3, 1), 4);
        let (v2, i2) = sprint_with_closed(2, "S2", (2025, 4, 1), 6);
        let (v3, i3) = sprint_with_closed(3, "S3", (2025, 5, 1), 8);
        let issues = [i1, i2, i3].concat();
        let snap = snapshot(issues, vec![v3.clone(), v1.clone(), v2.clone()]);

        let report = velocity_trend(&snap, PROJECT, 5);
        let names: Vec<&str> = report.per_sprint.iter().map(|s| s.version_name.as_str()).collect();
        assert_eq!(names, vec!["S1", "S2", "S3"]);
        assert_eq!(report.average_velocity, 6.0);
        assert_eq!(report.velocity_trend, "increasing");
    }

    #[test]
    fn test_takes_only_most_recent_n() {
        let (v1, i1) = sprint_with_closed(1, "S1", (2025, 1, 1), 10);
        let (v2, i2) = sprint_with_closed(2, "S2", (2025, 2, 1), 5);
        let (v3, i3) = sprint_with_closed(3, "S3", (2025, 3, 1), 5);
        let snap = snapshot([i1, i2, i3].concat(), vec![v1, v2, v3]);

        let report = velocity_trend(&snap, PROJECT, 2);
        let names: Vec<&str> = report.per_sprint.iter().map(|s| s.version_name.as_str()).collect();
        assert_eq!(names, vec!["S2", "S3"]);
        assert_eq!(report.velocity_trend, "stable");
    }

    #[test]
    fn test_decreasing_trend() {
        let (v1, i1) = sprint_with_closed(1, "S1", (2025, 3, 1), 10);
        let (v2, i2) = sprint_with_closed(2, "S2", (2025, 4, 1), 8);
        let snap = snapshot([i1, i2].concat(), vec![v1, v2]);
        let report = velocity_trend(&snap, PROJECT, 5);
        assert_eq!(report.velocity_trend, "decreasing");
    }

    #[test]
    fn test_open_versions_are_excluded() {
        let open_version = version(9, "current", VersionStatus::Open, Some(date(2025, 6, 1)));
        let snap = snapshot(Vec::new(), vec![open_version]);
        let report = velocity_trend(&snap, PROJECT, 5);
        assert!(report.per_sprint.is_empty());
    }
}
