// crates/core/src/analytics/bugs.rs
//! Bug analytics over the bug tracker partition.

use redmine_copilot_types::{BugAnalyticsReport, BugMetrics, CriticalOpen, IssueRecord, Snapshot};

use super::{mean, round1, round2};

pub fn bug_analytics(snapshot: &Snapshot, project_id: i64) -> BugAnalyticsReport {
    let bugs: Vec<&IssueRecord> = snapshot
        .project_issues(project_id)
        .filter(|i| i.tracker_name == "bug")
        .collect();

    let total_bugs = bugs.len() as u64;
    let open_bugs = bugs.iter().filter(|i| i.is_open()).count() as u64;
    let closed_bugs = total_bugs - open_bugs;

    let mut critical_open = CriticalOpen::default();
    for bug in bugs.iter().filter(|i| i.is_open()) {
        match bug.priority_name.as_str() {
            "high" => critical_open.high += 1,
            "urgent" => critical_open.urgent += 1,
            "immediate" => critical_open.immediate += 1,
            _ => {}
        }
    }
    critical_open.total_critical = critical_open.high + critical_open.urgent + critical_open.immediate;

    let open_stories = snapshot
        .project_issues(project_id)
        .filter(|i| i.tracker_name == "story" && i.is_open())
        .count() as u64;
    let bug_to_story_ratio = if open_stories == 0 {
        None
    } else {
        Some(round2(open_bugs as f64 / open_stories as f64))
    };

    let resolution_days: Vec<f64> = bugs
        .iter()
        .filter_map(|i| i.closed_on.map(|c| (c - i.created_on).num_seconds() as f64 / 86_400.0))
        .collect();

    BugAnalyticsReport {
        success: true,
        bug_metrics: BugMetrics {
            total_bugs,
            open_bugs,
            closed_bugs,
            critical_open,
            bug_to_story_ratio,
            average_resolution_days: mean(&resolution_days).map(round1),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::{at, snapshot, IssueBuilder, PROJECT};

    #[test]
    fn test_empty_project_zeros_and_nulls() {
        let snap = snapshot(Vec::new(), Vec::new());
        let m = bug_analytics(&snap, PROJECT).bug_metrics;
        assert_eq!(m.total_bugs, 0);
        assert_eq!(m.open_bugs, 0);
        assert_eq!(m.closed_bugs, 0);
        assert_eq!(m.bug_to_story_ratio, None);
        assert_eq!(m.average_resolution_days, None);
    }

    #[test]
    fn test_seed_scenario_three_bugs_two_stories() {
        // 3 bugs (2 closed, 1 open urgent), 2 stories (1 closed).
        let issues = vec![
            IssueBuilder::new(1).bug().created(at(2025, 5, 1)).closed(at(2025, 5, 3)).build(),
            IssueBuilder::new(2).bug().created(at(2025, 5, 1)).closed(at(2025, 5, 5)).build(),
            IssueBuilder::new(3).bug().priority(4, "urgent").build(),
            IssueBuilder::new(4).story().closed(at(2025, 5, 2)).build(),
            IssueBuilder::new(5).story().build(),
        ];
        let snap = snapshot(issues, Vec::new());
        let m = bug_analytics(&snap, PROJECT).bug_metrics;

        assert_eq!(m.total_bugs, 3);
        assert_eq!(m.open_bugs, 1);
        assert_eq!(m.closed_bugs, 2);
        assert_eq!(m.open_bugs + m.closed_bugs, m.total_bugs);
        assert_eq!(m.critical_open.urgent, 1);
        assert_eq!(m.critical_open.total_critical, 1);
        assert_eq!(m.bug_to_story_ratio, Some(1.0));
        // (2 + 4) / 2 days.
        assert_eq!(m.average_resolution_days, Some(3.0));
    }

    #[test]
    fn test_no_open_stories_gives_null_ratio() {
        let issues = vec![
            IssueBuilder::new(1).bug().build(),
            IssueBuilder::new(2).story().closed(at(2025, 5, 2)).build(),
        ];
        let snap = snapshot(issues, Vec::new());
        let m = bug_analytics(&snap, PROJECT).bug_metrics;
        assert_eq!(m.open_bugs, 1);
        assert_eq!(m.bug_to_story_ratio, None);
    }

    #[test]
    fn test_critical_counts_only_open_bugs() {
        let issues = vec![
            IssueBuilder::new(1).bug().priority(3, "high").build(),
            IssueBuilder::new(2).bug().priority(5, "immediate").build(),
            // Closed urgent bug is not critical_open.
            IssueBuilder::new(3).bug().priority(4, "urgent").closed(at(2025, 5, 1)).build(),
            // Open urgent story is not a bug.
            IssueBuilder::new(4).story().priority(4, "urgent").build(),
        ];
        let snap = snapshot(issues, Vec::new());
        let m = bug_analytics(&snap, PROJECT).bug_metrics;
        assert_eq!(m.critical_open.high, 1);
        assert_eq!(m.critical_open.immediate, 1);
        assert_eq!(m.critical_open.urgent, 0);
        assert_eq!(m.critical_open.total_critical, 2);
    }
}
