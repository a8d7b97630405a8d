// crates/core/src/analytics/mod.rs
//! Aggregation library: pure functions over a snapshot plus the
//! direct-count helpers that query the tracker live.

pub mod backlog;
pub mod bugs;
pub mod counts;
pub mod cycle_time;
pub mod release;
pub mod sprint;
pub mod throughput;
pub mod velocity;
pub mod workload;

/// Round to one decimal place, the precision the report contracts use.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Two decimals, used for ratios.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Percentage of `part` in `total`, one decimal, 0 when `total` is zero.
pub(crate) fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round1(part as f64 * 100.0 / total as f64)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Snapshot builders shared by the aggregation tests.

    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use redmine_copilot_types::{
        IssueRecord, ProjectRecord, Snapshot, VersionRecord, VersionStatus,
    };

    pub const PROJECT: i64 = 6;

    pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub struct IssueBuilder {
        record: IssueRecord,
    }

    impl IssueBuilder {
        pub fn new(id: i64) -> Self {
            Self {
                record: IssueRecord {
                    id,
                    subject: format!("issue {id}"),
                    project_id: PROJECT,
                    project_name: "NCEL".to_string(),
                    tracker_id: 2,
                    tracker_name: "feature".to_string(),
                    status_id: 1,
                    status_name: "new".to_string(),
                    priority_id: 2,
                    priority_name: "normal".to_string(),
                    assignee_id: None,
                    assignee_name: None,
                    version_id: None,
                    version_name: None,
                    estimated_hours: None,
                    spent_hours: None,
                    created_on: at(2025, 1, 1),
                    updated_on: at(2025, 1, 1),
                    closed_on: None,
                    start_date: None,
                    due_date: None,
                    done_ratio: 0,
                },
            }
        }

        pub fn tracker(mut self, id: i64, name: &str) -> Self {
            self.record.tracker_id = id;
            self.record.tracker_name = name.to_string();
            self
        }

        pub fn bug(self) -> Self {
            self.tracker(1, "bug")
        }

        pub fn story(self) -> Self {
            self.tracker(4, "story")
        }

        pub fn status(mut self, id: i64, name: &str) -> Self {
            self.record.status_id = id;
            self.record.status_name = name.to_string();
            self
        }

        pub fn priority(mut self, id: i64, name: &str) -> Self {
            self.record.priority_id = id;
            self.record.priority_name = name.to_string();
            self
        }

        pub fn assignee(mut self, id: i64, name: &str) -> Self {
            self.record.assignee_id = Some(id);
            self.record.assignee_name = Some(name.to_string());
            self
        }

        pub fn version(mut self, id: i64, name: &str) -> Self {
            self.record.version_id = Some(id);
            self.record.version_name = Some(name.to_string());
            self
        }

        pub fn estimated(mut self, hours: f64) -> Self {
            self.record.estimated_hours = Some(hours);
            self
        }

        pub fn spent(mut self, hours: f64) -> Self {
            self.record.spent_hours = Some(hours);
            self
        }

        pub fn created(mut self, on: DateTime<Utc>) -> Self {
            self.record.created_on = on;
            self
        }

        pub fn started(mut self, on: NaiveDate) -> Self {
            self.record.start_date = Some(on);
            self
        }

        pub fn closed(mut self, on: DateTime<Utc>) -> Self {
            self.record.closed_on = Some(on);
            self.record.status_id = 5;
            self.record.status_name = "closed".to_string();
            self
        }

        pub fn project(mut self, id: i64, name: &str) -> Self {
            self.record.project_id = id;
            self.record.project_name = name.to_string();
            self
        }

        pub fn build(self) -> IssueRecord {
            self.record
        }
    }

    pub fn version(id: i64, name: &str, status: VersionStatus, due: Option<NaiveDate>) -> VersionRecord {
        VersionRecord {
            id,
            project_id: PROJECT,
            name: name.to_string(),
            status,
            due_date: due,
        }
    }

    pub fn snapshot(issues: Vec<IssueRecord>, versions: Vec<VersionRecord>) -> Snapshot {
        Snapshot {
            issues,
            projects: vec![ProjectRecord {
                id: PROJECT,
                identifier: "ncel".to_string(),
                name: "NCEL".to_string(),
                description: None,
            }],
            versions,
            users: Vec::new(),
            fetched_at: at(2025, 6, 1),
            issues_truncated: false,
            endpoint_errors: Vec::new(),
        }
    }
}
