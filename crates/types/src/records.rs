// crates/types/src/records.rs
//! Normalized tracker records as projected into the analytic snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Statuses that count as "closed". Everything else is open.
pub const CLOSED_STATUSES: [&str; 3] = ["closed", "rejected", "cancelled"];

/// Priorities that count as "critical" for backlog and bug reporting.
pub const CRITICAL_PRIORITIES: [&str; 3] = ["high", "urgent", "immediate"];

/// One issue row in the snapshot.
///
/// All instants are timezone-aware UTC; `start_date`/`due_date` are calendar
/// dates with no time component, as the tracker reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: i64,
    pub subject: String,
    pub project_id: i64,
    pub project_name: String,
    pub tracker_id: i64,
    pub tracker_name: String,
    pub status_id: i64,
    pub status_name: String,
    pub priority_id: i64,
    pub priority_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent_hours: Option<f64>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_on: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub done_ratio: u8,
}

impl IssueRecord {
    /// Whether the issue's status is in the closed partition.
    pub fn is_closed(&self) -> bool {
        CLOSED_STATUSES.contains(&self.status_name.as_str())
    }

    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }

    /// Whether the issue's priority is high/urgent/immediate.
    pub fn is_critical(&self) -> bool {
        CRITICAL_PRIORITIES.contains(&self.priority_name.as_str())
    }
}

/// One project row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub identifier: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Lifecycle state of a tracker version (sprint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Open,
    Locked,
    Closed,
}

/// One version (sprint) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub status: VersionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// One user row. The users table may be empty when the tracker denies the
/// listing endpoint; assignee names on issues remain usable regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
}

/// A status transition recorded in an issue's change journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from_status: String,
    pub to_status: String,
}

impl StatusTransition {
    /// A closed→open transition marks the issue as reopened.
    pub fn is_reopen(&self) -> bool {
        CLOSED_STATUSES.contains(&self.from_status.as_str())
            && !CLOSED_STATUSES.contains(&self.to_status.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issue(status: &str, priority: &str) -> IssueRecord {
        IssueRecord {
            id: 1,
            subject: "test".to_string(),
            project_id: 6,
            project_name: "NCEL".to_string(),
            tracker_id: 1,
            tracker_name: "bug".to_string(),
            status_id: 1,
            status_name: status.to_string(),
            priority_id: 2,
            priority_name: priority.to_string(),
            assignee_id: None,
            assignee_name: None,
            version_id: None,
            version_name: None,
            estimated_hours: None,
            spent_hours: None,
            created_on: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            updated_on: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            closed_on: None,
            start_date: None,
            due_date: None,
            done_ratio: 0,
        }
    }

    #[test]
    fn test_closed_partition() {
        assert!(issue("closed", "normal").is_closed());
        assert!(issue("rejected", "normal").is_closed());
        assert!(issue("cancelled", "normal").is_closed());
        assert!(issue("new", "normal").is_open());
        assert!(issue("in_progress", "normal").is_open());
        assert!(issue("feedback", "normal").is_open());
        assert!(issue("backlog", "normal").is_open());
    }

    #[test]
    fn test_critical_priorities() {
        assert!(issue("new", "high").is_critical());
        assert!(issue("new", "urgent").is_critical());
        assert!(issue("new", "immediate").is_critical());
        assert!(!issue("new", "normal").is_critical());
        assert!(!issue("new", "low").is_critical());
    }

    #[test]
    fn test_reopen_transition() {
        let t = StatusTransition {
            from_status: "closed".to_string(),
            to_status: "in_progress".to_string(),
        };
        assert!(t.is_reopen());

        let t = StatusTransition {
            from_status: "new".to_string(),
            to_status: "closed".to_string(),
        };
        assert!(!t.is_reopen());

        let t = StatusTransition {
            from_status: "rejected".to_string(),
            to_status: "cancelled".to_string(),
        };
        assert!(!t.is_reopen());
    }

    #[test]
    fn test_version_status_serde() {
        let v = VersionRecord {
            id: 3,
            project_id: 6,
            name: "Week-7".to_string(),
            status: VersionStatus::Closed,
            due_date: None,
        };
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"status\":\"closed\""));
        let back: VersionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, VersionStatus::Closed);
    }
}
