// crates/core/src/analytics/workload.rs
//! Team workload: open issues per assignee.

use std::collections::BTreeMap;

use redmine_copilot_types::{Snapshot, TeamWorkloadReport};

/// Label used for issues with no assignee. Part of the report contract.
pub const UNASSIGNED: &str = "Unassigned";

pub fn team_workload(snapshot: &Snapshot, project_id: i64, overload_threshold: u64) -> TeamWorkloadReport {
    let mut workload_by_member: BTreeMap<String, u64> = BTreeMap::new();
    let mut total_open_issues = 0u64;

    for issue in snapshot.project_issues(project_id).filter(|i| i.is_open()) {
        total_open_issues += 1;
        let member = issue
            .assignee_name
            .clone()
            .unwrap_or_else(|| UNASSIGNED.to_string());
        *workload_by_member.entry(member).or_insert(0) += 1;
    }

    let unassigned_issues = workload_by_member.get(UNASSIGNED).copied().unwrap_or(0);
    let overloaded_members: BTreeMap<String, u64> = workload_by_member
        .iter()
        .filter(|(_, &count)| count > overload_threshold)
        .map(|(name, &count)| (name.clone(), count))
        .collect();

    TeamWorkloadReport {
        success: true,
        team_size: workload_by_member.len() as u64,
        workload_by_member,
        total_open_issues,
        unassigned_issues,
        overloaded_members,
    }
}
