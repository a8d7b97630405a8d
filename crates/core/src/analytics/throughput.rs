// crates/core/src/analytics/throughput.rs
//! Weekly throughput: created vs. closed per aligned ISO week.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Utc};
use redmine_copilot_types::{Snapshot, ThroughputReport, WeekThroughput};

use super::round1;

pub fn throughput(
    snapshot: &Snapshot,
    project_id: i64,
    weeks: usize,
    now: DateTime<Utc>,
    report_offset: FixedOffset,
) -> ThroughputReport {
    let today = now.with_timezone(&report_offset).date_naive();
    let current_week_start = today - Days::new(u64::from(today.weekday().num_days_from_monday()));

    let local_date = |instant: DateTime<Utc>| instant.with_timezone(&report_offset).date_naive();
    let in_week = |date: NaiveDate, start: NaiveDate| date >= start && date < start + Days::new(7);

    let weekly_breakdown: Vec<WeekThroughput> = (0..weeks)
        .rev()
        .map(|back| {
            let week_start = current_week_start - Days::new(7 * back as u64);
            let created = snapshot
                .project_issues(project_id)
                .filter(|i| in_week(local_date(i.created_on), week_start))
                .count() as u64;
            let closed = snapshot
                .project_issues(project_id)
                .filter(|i| i.closed_on.is_some_and(|c| in_week(local_date(c), week_start)))
                .count() as u64;
            WeekThroughput {
                week_start,
                created,
                closed,
                net: created as i64 - closed as i64,
            }
        })
        .collect();

    let weeks_len = weekly_breakdown.len().max(1) as f64;
    let total_created: u64 = weekly_breakdown.iter().map(|w| w.created).sum();
    let total_closed: u64 = weekly_breakdown.iter().map(|w| w.closed).sum();
    let net_throughput: i64 = weekly_breakdown.iter().map(|w| w.net).sum();

    ThroughputReport {
        success: true,
        weekly_breakdown,
        avg_created_per_week: round1(total_created as f64 / weeks_len),
        avg_closed_per_week: round1(total_closed as f64 / weeks_len),
        net_throughput,
        trend: if net_throughput >= 0 { "positive" } else { "negative" }.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::{at, date, snapshot, IssueBuilder, PROJECT};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_week_alignment_starts_monday() {
        // 2025-06-15 is a Sunday; its ISO week starts Monday 2025-06-09.
        let snap = snapshot(Vec::new(), Vec::new());
        let report = throughput(&snap, PROJECT, 2, at(2025, 6, 15), utc());
        assert_eq!(report.weekly_breakdown.len(), 2);
        assert_eq!(report.weekly_breakdown[1].week_start, date(2025, 6, 9));
        assert_eq!(report.weekly_breakdown[0].week_start, date(2025, 6, 2));
    }

    #[test]
    fn test_counts_per_week_and_net() {
        // Current week (Mon 2025-06-09 .. Sun 2025-06-15): 2 created, 1 closed.
        // Previous week: 1 created, 2 closed.
        let issues = vec![
            IssueBuilder::new(1).created(at(2025, 6, 9)).build(),
            IssueBuilder::new(2).created(at(2025, 6, 10)).build(),
            IssueBuilder::new(3).created(at(2025, 6, 2)).closed(at(2025, 6, 11)).build(),
            IssueBuilder::new(4).created(at(2025, 5, 1)).closed(at(2025, 6, 3)).build(),
            IssueBuilder::new(5).created(at(2025, 5, 1)).closed(at(2025, 6, 4)).build(),
        ];
        let snap = snapshot(issues, Vec::new());
        let report = throughput(&snap, PROJECT, 2, at(2025, 6, 15), utc());

        let prev = &report.weekly_breakdown[0];
        assert_eq!((prev.created, prev.closed, prev.net), (1, 2, -1));
        let current = &report.weekly_breakdown[1];
        assert_eq!((current.created, current.closed, current.net), (2, 1, 1));

        assert_eq!(report.net_throughput, 0);
        assert_eq!(report.trend, "positive");
        assert_eq!(report.avg_created_per_week, 1.5);
        assert_eq!(report.avg_closed_per_week, 1.5);
    }

    #[test]
    fn test_negative_trend_when_closures_dominate() {
        let issues = vec![
            IssueBuilder::new(1).created(at(2025, 1, 1)).closed(at(2025, 6, 12)).build(),
            IssueBuilder::new(2).created(at(2025, 1, 1)).closed(at(2025, 6, 13)).build(),
        ];
        let snap = snapshot(issues, Vec::new());
        let report = throughput(&snap, PROJECT, 1, at(2025, 6, 15), utc());
        assert_eq!(report.net_throughput, -2);
        assert_eq!(report.trend, "negative");
    }

    #[test]
    fn test_empty_project_is_positive_zero() {
        let snap = snapshot(Vec::new(), Vec::new());
        let report = throughput(&snap, PROJECT, 4, at(2025, 6, 15), utc());
        assert_eq!(report.net_throughput, 0);
        assert_eq!(report.trend, "positive");
        assert_eq!(report.avg_created_per_week, 0.0);
    }

    #[test]
    fn test_issues_outside_window_ignored() {
        let issues = vec![IssueBuilder::new(1).created(at(2025, 1, 1)).build()];
        let snap = snapshot(issues, Vec::new());
        let report = throughput(&snap, PROJECT, 2, at(2025, 6, 15), utc());
        assert!(report.weekly_breakdown.iter().all(|w| w.created == 0));
    }
}
