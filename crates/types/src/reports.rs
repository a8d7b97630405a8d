// crates/types/src/reports.rs
//! Analytic report shapes. The top-level keys are a contract: the rendering
//! layer dispatches on `sprint`+`metrics`, `backlog`, `workload_by_member`,
//! `bug_metrics`, `lead_time`/`cycle_time`, `releases`, `per_sprint`, and
//! `weekly_breakdown`, so fields here must not be renamed or nested.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sprint identity resolved from the version table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SprintInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintMetrics {
    pub committed: u64,
    pub completed: u64,
    pub in_progress: u64,
    pub blocked: u64,
    pub remaining: u64,
    pub completion_pct: f64,
    pub total_estimated_hours: f64,
    pub total_spent_hours: f64,
    pub breakdown_by_status: BTreeMap<String, u64>,
    pub burndown_assessment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintStatusReport {
    pub success: bool,
    pub sprint: SprintInfo,
    pub metrics: SprintMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogAging {
    /// Mean days open over open issues, one decimal. Null on an empty set.
    pub average_days_open: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyActivity {
    pub created_this_month: u64,
    pub closed_this_month: u64,
    pub net_change: i64,
    /// `YYYY-MM` in the configured reporting zone.
    pub month: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogMetrics {
    pub total_open: u64,
    pub high_priority_open: u64,
    pub unestimated_percentage: f64,
    pub aging: BacklogAging,
    pub monthly_activity: MonthlyActivity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogReport {
    pub success: bool,
    pub backlog: BacklogMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamWorkloadReport {
    pub success: bool,
    /// Open-issue count per assignee display name, `"Unassigned"` for null.
    pub workload_by_member: BTreeMap<String, u64>,
    pub total_open_issues: u64,
    pub unassigned_issues: u64,
    pub team_size: u64,
    /// Members whose open count exceeds the configured threshold.
    pub overloaded_members: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTime {
    pub average_days: Option<f64>,
    pub sample_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleTime {
    pub average_days: Option<f64>,
    /// True when `start_date` was absent and `created_on` was used instead.
    pub fallback_used: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReopenedTickets {
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleTimeReport {
    pub success: bool,
    pub lead_time: LeadTime,
    pub cycle_time: CycleTime,
    pub reopened_tickets: ReopenedTickets,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalOpen {
    pub high: u64,
    pub urgent: u64,
    pub immediate: u64,
    pub total_critical: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugMetrics {
    pub total_bugs: u64,
    pub open_bugs: u64,
    pub closed_bugs: u64,
    pub critical_open: CriticalOpen,
    /// Null when there are no open stories, never a division error.
    pub bug_to_story_ratio: Option<f64>,
    pub average_resolution_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugAnalyticsReport {
    pub success: bool,
    pub bug_metrics: BugMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub version_name: String,
    pub total_issues: u64,
    pub closed_issues: u64,
    pub open_issues: u64,
    pub completion_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// A named version yields `release`; a project-wide query yields `releases`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseStatusReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub releases: Option<Vec<ReleaseInfo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintVelocity {
    pub version_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub completed_issues: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityTrendReport {
    pub success: bool,
    /// Oldest → newest.
    pub per_sprint: Vec<SprintVelocity>,
    pub average_velocity: f64,
    pub velocity_trend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekThroughput {
    /// Monday of the ISO week.
    pub week_start: NaiveDate,
    pub created: u64,
    pub closed: u64,
    pub net: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputReport {
    pub success: bool,
    /// Oldest → newest.
    pub weekly_breakdown: Vec<WeekThroughput>,
    pub avg_created_per_week: f64,
    pub avg_closed_per_week: f64,
    pub net_throughput: i64,
    pub trend: String,
}
