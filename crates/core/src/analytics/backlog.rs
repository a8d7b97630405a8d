// crates/core/src/analytics/backlog.rs
//! Backlog analytics: open totals, estimation coverage, aging, and
//! current-month churn.

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use redmine_copilot_types::{
    BacklogAging, BacklogMetrics, BacklogReport, IssueRecord, MonthlyActivity, Snapshot,
};

use super::{mean, percentage, round1};

pub fn backlog_analytics(
    snapshot: &Snapshot,
    project_id: i64,
    now: DateTime<Utc>,
    report_offset: FixedOffset,
) -> BacklogReport {
    let open: Vec<&IssueRecord> = snapshot
        .project_issues(project_id)
        .filter(|i| i.is_open())
        .collect();

    let total_open = open.len() as u64;
    let high_priority_open = open.iter().filter(|i| i.is_critical()).count() as u64;
    let unestimated = open
        .iter()
        .filter(|i| i.estimated_hours.unwrap_or(0.0) == 0.0)
        .count() as u64;

    let days_open: Vec<f64> = open
        .iter()
        .map(|i| (now - i.created_on).num_seconds() as f64 / 86_400.0)
        .collect();
    let average_days_open = mean(&days_open).map(round1);

    let local_now = now.with_timezone(&report_offset);
    let (year, month) = (local_now.year(), local_now.month());
    let in_this_month = |instant: DateTime<Utc>| {
        let local = instant.with_timezone(&report_offset);
        local.year() == year && local.month() == month
    };

    let created_this_month = snapshot
        .project_issues(project_id)
        .filter(|i| in_this_month(i.created_on))
        .count() as u64;
    let closed_this_month = snapshot
        .project_issues(project_id)
        .filter(|i| i.closed_on.is_some_and(in_this_month))
        .count() as u64;

    BacklogReport {
        success: true,
        backlog: BacklogMetrics {
            total_open,
            high_priority_open,
            unestimated_percentage: percentage(unestimated, total_open),
            aging: BacklogAging { average_days_open },
            monthly_activity: MonthlyActivity {
                created_this_month,
                closed_this_month,
                net_change: created_this_month as i64 - closed_this_month as i64,
                month: format!("{year:04}-{month:02}"),
            },
        },
    }
}
