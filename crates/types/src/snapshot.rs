// crates/types/src/snapshot.rs
//! The immutable analytic snapshot and its bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::{IssueRecord, ProjectRecord, UserRecord, VersionRecord};

/// A tracker endpoint that failed during a refresh (e.g. users → 403).
/// Recorded as a partial-data marker, never a refresh failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointError {
    pub endpoint: String,
    pub status: u16,
}

/// Per-table row counts reported by the cache status surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCounts {
    pub issues: usize,
    pub projects: usize,
    pub users: usize,
    pub versions: usize,
}

/// An immutable projection of the tracker, built by one refresh and replaced
/// wholesale by the next. Readers hold an `Arc<Snapshot>` taken at call
/// entry, so a refresh mid-aggregation is invisible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub issues: Vec<IssueRecord>,
    pub projects: Vec<ProjectRecord>,
    pub versions: Vec<VersionRecord>,
    pub users: Vec<UserRecord>,
    pub fetched_at: DateTime<Utc>,
    /// True when the issue fetch stopped at the configured row cap.
    pub issues_truncated: bool,
    pub endpoint_errors: Vec<EndpointError>,
}

impl Snapshot {
    /// An empty snapshot stamped with the given fetch instant.
    pub fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self {
            issues: Vec::new(),
            projects: Vec::new(),
            versions: Vec::new(),
            users: Vec::new(),
            fetched_at,
            issues_truncated: false,
            endpoint_errors: Vec::new(),
        }
    }

    pub fn counts(&self) -> SnapshotCounts {
        SnapshotCounts {
            issues: self.issues.len(),
            projects: self.projects.len(),
            users: self.users.len(),
            versions: self.versions.len(),
        }
    }

    /// Snapshot age relative to `now`, clamped to zero.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> u64 {
        (now - self.fetched_at).num_seconds().max(0) as u64
    }

    /// Issues belonging to one project.
    pub fn project_issues(&self, project_id: i64) -> impl Iterator<Item = &IssueRecord> {
        self.issues.iter().filter(move |i| i.project_id == project_id)
    }

    /// Versions belonging to one project.
    pub fn project_versions(&self, project_id: i64) -> impl Iterator<Item = &VersionRecord> {
        self.versions.iter().filter(move |v| v.project_id == project_id)
    }

    /// Look up a version by name within a project (exact match).
    pub fn find_version(&self, project_id: i64, name: &str) -> Option<&VersionRecord> {
        self.versions
            .iter()
            .find(|v| v.project_id == project_id && v.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_snapshot_counts() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let snap = Snapshot::empty(now);
        assert_eq!(snap.counts(), SnapshotCounts::default());
        assert!(!snap.issues_truncated);
    }

    #[test]
    fn test_age_seconds_clamps_to_zero() {
        let fetched = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let snap = Snapshot::empty(fetched);
        // Clock skew: a "now" before fetched_at must not underflow.
        let earlier = Utc.with_ymd_and_hms(2025, 6, 1, 11, 59, 0).unwrap();
        assert_eq!(snap.age_seconds(earlier), 0);
        let later = Utc.with_ymd_and_hms(2025, 6, 1, 12, 5, 0).unwrap();
        assert_eq!(snap.age_seconds(later), 300);
    }
}
