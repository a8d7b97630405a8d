// crates/core/src/analytics/cycle_time.rs
//! Lead time, cycle time, and reopened-ticket rate over closed issues.
//!
//! Lead and cycle times are pure snapshot aggregations. The reopened count
//! needs per-issue change journals, which the snapshot does not carry, so a
//! bounded sample of recently closed issues is fetched live; an inaccessible
//! journal degrades the field to `count=null` rather than failing the report.

use redmine_copilot_types::{CycleTime, CycleTimeReport, IssueRecord, LeadTime, ReopenedTickets, Snapshot};

use crate::redmine::RedmineClient;

use super::{mean, round1};

/// Upper bound on journal fetches per report.
const JOURNAL_SAMPLE: usize = 30;

/// Pure part: lead/cycle averages plus the ids to sample for journals,
/// most recently closed first.
pub fn cycle_time_metrics(snapshot: &Snapshot, project_id: i64) -> (LeadTime, CycleTime, Vec<i64>) {
    let mut closed: Vec<&IssueRecord> = snapshot
        .project_issues(project_id)
        .filter(|i| i.closed_on.is_some())
        .collect();
    closed.sort_by_key(|i| std::cmp::Reverse(i.closed_on));

    let lead_days: Vec<f64> = closed
        .iter()
        .filter_map(|i| i.closed_on.map(|c| (c - i.created_on).num_seconds() as f64 / 86_400.0))
        .collect();

    let mut fallback_used = false;
    let cycle_days: Vec<f64> = closed
        .iter()
        .filter_map(|i| {
            let closed_on = i.closed_on?;
            match i.start_date {
                Some(start) => {
                    Some((closed_on.date_naive() - start).num_days() as f64)
                }
                None => {
                    fallback_used = true;
                    Some((closed_on - i.created_on).num_seconds() as f64 / 86_400.0)
                }
            }
        })
        .collect();

    let lead_time = LeadTime {
        average_days: mean(&lead_days).map(round1),
        sample_size: closed.len() as u64,
    };
    let cycle_time = CycleTime {
        average_days: mean(&cycle_days).map(round1),
        fallback_used,
    };
    let sample_ids = closed.iter().take(JOURNAL_SAMPLE).map(|i| i.id).collect();

    (lead_time, cycle_time, sample_ids)
}

/// Count reopened issues (a journal status transition from a closed status
/// back to an open one) across the sample. Any journal failure returns
/// `None`; the caller reports `journal_unavailable`.
pub async fn reopened_count(
    client: &RedmineClient,
    sample_ids: &[i64],
    closed_status_ids: &[i64],
) -> Option<u64> {
    let mut count = 0u64;
    for &issue_id in sample_ids {
        match client.fetch_issue_with_journals(issue_id).await {
            Ok((_, changes)) => {
                let reopened = changes.iter().any(|c| {
                    closed_status_ids.contains(&c.from_status_id)
                        && !closed_status_ids.contains(&c.to_status_id)
                });
                if reopened {
                    count += 1;
                }
            }
            Err(e) => {
                tracing::warn!(issue_id, error = %e, "journal fetch failed");
                return None;
            }
        }
    }
    Some(count)
}

/// Assemble the full report from the pure metrics and the journal sample.
pub async fn cycle_time_report(
    snapshot: &Snapshot,
    project_id: i64,
    client: &RedmineClient,
    closed_status_ids: &[i64],
) -> CycleTimeReport {
    let (lead_time, cycle_time, sample_ids) = cycle_time_metrics(snapshot, project_id);

    let reopened_tickets = if sample_ids.is_empty() {
        ReopenedTickets { count: Some(0), percentage: Some(0.0), reason: None }
    } else {
        match reopened_count(client, &sample_ids, closed_status_ids).await {
            Some(count) => ReopenedTickets {
                count: Some(count),
                percentage: Some(round1(count as f64 * 100.0 / sample_ids.len() as f64)),
                reason: None,
            },
            None => ReopenedTickets {
                count: None,
                percentage: None,
                reason: Some("journal_unavailable".to_string()),
            },
        }
    };

    CycleTimeReport { success: true, lead_time, cycle_time, reopened_tickets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::{at, date, snapshot, IssueBuilder, PROJECT};

    #[test]
    fn test_empty_project_has_null_averages() {
        let snap = snapshot(Vec::new(), Vec::new());
        let (lead, cycle, sample) = cycle_time_metrics(&snap, PROJECT);
        assert_eq!(lead.average_days, None);
        assert_eq!(lead.sample_size, 0);
        assert_eq!(cycle.average_days, None);
        assert!(!cycle.fallback_used);
        assert!(sample.is_empty());
    }

    #[test]
    fn test_lead_time_average() {
        let issues = vec![
            // 10 days and 20 days from creation to close.
            IssueBuilder::new(1).created(at(2025, 5, 1)).closed(at(2025, 5, 11)).build(),
            IssueBuilder::new(2).created(at(2025, 5, 1)).closed(at(2025, 5, 21)).build(),
            // Still open, not in the sample.
            IssueBuilder::new(3).created(at(2025, 5, 1)).build(),
        ];
        let snap = snapshot(issues, Vec::new());
        let (lead, _, sample) = cycle_time_metrics(&snap, PROJECT);
        assert_eq!(lead.average_days, Some(15.0));
        assert_eq!(lead.sample_size, 2);
        // Most recently closed first.
        assert_eq!(sample, vec![2, 1]);
    }

    #[test]
    fn test_cycle_time_uses_start_date_with_fallback_flag() {
        let issues = vec![
            // start_date present: 5 days.
            IssueBuilder::new(1)
                .created(at(2025, 5, 1))
                .started(date(2025, 5, 6))
                .closed(at(2025, 5, 11))
                .build(),
            // No start_date: falls back to created_on (10 days).
            IssueBuilder::new(2).created(at(2025, 5, 1)).closed(at(2025, 5, 11)).build(),
        ];
        let snap = snapshot(issues, Vec::new());
        let (_, cycle, _) = cycle_time_metrics(&snap, PROJECT);
        assert_eq!(cycle.average_days, Some(7.5));
        assert!(cycle.fallback_used);
    }

    #[test]
    fn test_no_fallback_when_all_have_start_dates() {
        let issues = vec![IssueBuilder::new(1)
            .created(at(2025, 5, 1))
            .started(date(2025, 5, 3))
            .closed(at(2025, 5, 11))
            .build()];
        let snap = snapshot(issues, Vec::new());
        let (_, cycle, _) = cycle_time_metrics(&snap, PROJECT);
        assert_eq!(cycle.average_days, Some(8.0));
        assert!(!cycle.fallback_used);
    }

    #[tokio::test]
    async fn test_report_with_no_closed_issues_skips_journal_fetch() {
        let snap = snapshot(vec![IssueBuilder::new(1).build()], Vec::new());
        // Client points at a closed port; with an empty sample it is unused.
        let client = RedmineClient::new("http://127.0.0.1:1", "k", 1000).unwrap();
        let report = cycle_time_report(&snap, PROJECT, &client, &[5, 6, 8]).await;
        assert!(report.success);
        assert_eq!(report.reopened_tickets.count, Some(0));
        assert_eq!(report.reopened_tickets.percentage, Some(0.0));
        assert_eq!(report.reopened_tickets.reason, None);
    }

    #[tokio::test]
    async fn test_unreachable_journal_reports_unavailable() {
        let issues = vec![IssueBuilder::new(1).created(at(2025, 5, 1)).closed(at(2025, 5, 2)).build()];
        let snap = snapshot(issues, Vec::new());
        let client = RedmineClient::new("http://127.0.0.1:1", "k", 1000).unwrap();
        let report = cycle_time_report(&snap, PROJECT, &client, &[5, 6, 8]).await;
        assert_eq!(report.reopened_tickets.count, None);
        assert_eq!(report.reopened_tickets.reason.as_deref(), Some("journal_unavailable"));
    }
}
