// crates/core/src/redmine/types.rs
//! Wire DTOs for the tracker's JSON surface and their conversion into the
//! normalized snapshot records.

use chrono::{DateTime, NaiveDate, Utc};
use redmine_copilot_types::{
    IssueRecord, ProjectRecord, UserRecord, VersionRecord, VersionStatus,
};
use serde::Deserialize;

/// The tracker's nested reference shape, `{"id": 6, "name": "NCEL"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

/// The tracker reports enum values as display names ("In Progress"); the
/// snapshot stores the canonical lowercase form the enum maps use.
pub fn normalize_enum_name(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

#[derive(Debug, Deserialize)]
pub struct IssueDto {
    pub id: i64,
    pub subject: String,
    pub project: NamedRef,
    pub tracker: NamedRef,
    pub status: NamedRef,
    pub priority: NamedRef,
    #[serde(default)]
    pub assigned_to: Option<NamedRef>,
    #[serde(default)]
    pub fixed_version: Option<NamedRef>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub spent_hours: Option<f64>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    #[serde(default)]
    pub closed_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub done_ratio: u8,
    #[serde(default)]
    pub journals: Option<Vec<JournalDto>>,
}

impl IssueDto {
    pub fn into_record(self) -> IssueRecord {
        IssueRecord {
            id: self.id,
            subject: self.subject,
            project_id: self.project.id,
            project_name: self.project.name,
            tracker_id: self.tracker.id,
            tracker_name: normalize_enum_name(&self.tracker.name),
            status_id: self.status.id,
            status_name: normalize_enum_name(&self.status.name),
            priority_id: self.priority.id,
            priority_name: normalize_enum_name(&self.priority.name),
            assignee_id: self.assigned_to.as_ref().map(|a| a.id),
            assignee_name: self.assigned_to.map(|a| a.name),
            version_id: self.fixed_version.as_ref().map(|v| v.id),
            version_name: self.fixed_version.map(|v| v.name),
            estimated_hours: self.estimated_hours,
            spent_hours: self.spent_hours,
            created_on: self.created_on,
            updated_on: self.updated_on,
            closed_on: self.closed_on,
            start_date: self.start_date,
            due_date: self.due_date,
            done_ratio: self.done_ratio.min(100),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IssuesPageDto {
    pub issues: Vec<IssueDto>,
    pub total_count: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

/// Only `total_count` is consumed from `limit=1` count calls.
#[derive(Debug, Deserialize)]
pub struct CountDto {
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct SingleIssueDto {
    pub issue: IssueDto,
}

#[derive(Debug, Deserialize)]
pub struct JournalDto {
    #[serde(default)]
    pub details: Vec<JournalDetailDto>,
}

#[derive(Debug, Deserialize)]
pub struct JournalDetailDto {
    pub property: String,
    pub name: String,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
}

/// A status transition extracted from an issue journal, as raw status ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from_status_id: i64,
    pub to_status_id: i64,
}

/// Pull `status_id` attribute changes out of a journal list.
pub fn status_changes(journals: &[JournalDto]) -> Vec<StatusChange> {
    journals
        .iter()
        .flat_map(|j| j.details.iter())
        .filter(|d| d.property == "attr" && d.name == "status_id")
        .filter_map(|d| {
            let from = d.old_value.as_deref()?.parse().ok()?;
            let to = d.new_value.as_deref()?.parse().ok()?;
            Some(StatusChange { from_status_id: from, to_status_id: to })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct ProjectDto {
    pub id: i64,
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectDto {
    pub fn into_record(self) -> ProjectRecord {
        ProjectRecord {
            id: self.id,
            identifier: self.identifier,
            name: self.name,
            description: self.description.filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectsPageDto {
    pub projects: Vec<ProjectDto>,
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct VersionDto {
    pub id: i64,
    pub project: NamedRef,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl VersionDto {
    pub fn into_record(self) -> VersionRecord {
        let status = match self.status.as_str() {
            "locked" => VersionStatus::Locked,
            "closed" => VersionStatus::Closed,
            _ => VersionStatus::Open,
        };
        VersionRecord {
            id: self.id,
            project_id: self.project.id,
            name: self.name,
            status,
            due_date: self.due_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VersionsDto {
    pub versions: Vec<VersionDto>,
}

#[derive(Debug, Deserialize)]
pub struct UserDto {
    pub id: i64,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
}

impl UserDto {
    pub fn into_record(self) -> UserRecord {
        let name = match (&self.firstname, &self.lastname) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.clone(),
            (None, Some(l)) => l.clone(),
            (None, None) => self.login.clone().unwrap_or_else(|| format!("user-{}", self.id)),
        };
        UserRecord { id: self.id, name }
    }
}

#[derive(Debug, Deserialize)]
pub struct UsersPageDto {
    pub users: Vec<UserDto>,
    pub total_count: u64,
}

/// One value from an enum listing endpoint (statuses, trackers, priorities).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnumValue {
    pub id: i64,
    pub name: String,
}

/// Which enum listing endpoint to hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    Statuses,
    Trackers,
    Priorities,
}

impl EnumKind {
    pub fn path(self) -> &'static str {
        match self {
            EnumKind::Statuses => "/issue_statuses.json",
            EnumKind::Trackers => "/trackers.json",
            EnumKind::Priorities => "/enumerations/issue_priorities.json",
        }
    }

    pub fn list_key(self) -> &'static str {
        match self {
            EnumKind::Statuses => "issue_statuses",
            EnumKind::Trackers => "trackers",
            EnumKind::Priorities => "issue_priorities",
        }
    }
}

/// Status filter understood by the tracker's `status_id` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Open,
    Closed,
    All,
    Id(i64),
}

impl StatusFilter {
    fn as_query_value(self) -> String {
        match self {
            StatusFilter::Open => "open".to_string(),
            StatusFilter::Closed => "closed".to_string(),
            StatusFilter::All => "*".to_string(),
            StatusFilter::Id(id) => id.to_string(),
        }
    }
}

/// Filter parameters for issue listing and count queries.
#[derive(Debug, Clone, Default)]
pub struct IssueFilters {
    pub project_id: Option<i64>,
    pub tracker_id: Option<i64>,
    pub status: Option<StatusFilter>,
    pub priority_id: Option<i64>,
    pub assigned_to_id: Option<i64>,
    pub fixed_version_id: Option<i64>,
    /// Range expressions as the tracker accepts them, e.g. `>=2025-01-01`.
    pub created_on: Option<String>,
    pub updated_on: Option<String>,
    pub closed_on: Option<String>,
}

impl IssueFilters {
    pub fn project(project_id: i64) -> Self {
        Self { project_id: Some(project_id), ..Self::default() }
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tracker(mut self, tracker_id: i64) -> Self {
        self.tracker_id = Some(tracker_id);
        self
    }

    pub fn with_version(mut self, version_id: i64) -> Self {
        self.fixed_version_id = Some(version_id);
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if let Some(id) = self.project_id {
            q.push(("project_id".to_string(), id.to_string()));
        }
        if let Some(id) = self.tracker_id {
            q.push(("tracker_id".to_string(), id.to_string()));
        }
        if let Some(status) = self.status {
            q.push(("status_id".to_string(), status.as_query_value()));
        }
        if let Some(id) = self.priority_id {
            q.push(("priority_id".to_string(), id.to_string()));
        }
        if let Some(id) = self.assigned_to_id {
            q.push(("assigned_to_id".to_string(), id.to_string()));
        }
        if let Some(id) = self.fixed_version_id {
            q.push(("fixed_version_id".to_string(), id.to_string()));
        }
        if let Some(range) = &self.created_on {
            q.push(("created_on".to_string(), range.clone()));
        }
        if let Some(range) = &self.updated_on {
            q.push(("updated_on".to_string(), range.clone()));
        }
        if let Some(range) = &self.closed_on {
            q.push(("closed_on".to_string(), range.clone()));
        }
        q
    }
}
