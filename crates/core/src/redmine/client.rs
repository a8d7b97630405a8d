// crates/core/src/redmine/client.rs
//! Authenticated tracker client: paginated listings, count-only queries,
//! and single-resource fetches with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use redmine_copilot_types::{IssueRecord, ProjectRecord, UserRecord, VersionRecord};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;

use crate::error::RedmineError;

use super::types::{
    status_changes, CountDto, EnumKind, EnumValue, IssueFilters, IssuesPageDto, ProjectsPageDto,
    SingleIssueDto, StatusChange, UsersPageDto, VersionsDto,
};

/// Page size for full-table fetches. The tracker caps pages at 100 rows.
const PAGE_SIZE: u64 = 100;

/// Retry policy for idempotent GETs on transient failures.
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(250);
const BACKOFF_CAP: Duration = Duration::from_secs(4);

/// Concurrency cap on tracker calls, shared across all requests.
const MAX_IN_FLIGHT: usize = 8;

/// Result of a full issue-table fetch.
#[derive(Debug)]
pub struct IssueFetch {
    pub records: Vec<IssueRecord>,
    pub total_count: u64,
    /// True when the fetch stopped at the configured row cap.
    pub truncated: bool,
}

/// HTTP client for the tracker REST surface.
///
/// All operations are GETs authenticated with the API-key header. Transient
/// failures (`unreachable`, `rate_limited`) retry with exponential backoff;
/// `forbidden`/`not_found` surface immediately so the cache engine can record
/// them as partial-data markers.
pub struct RedmineClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_issues: usize,
    permits: Arc<Semaphore>,
}

impl RedmineClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, max_issues: usize) -> Result<Self, RedmineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RedmineError::Unreachable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_issues,
            permits: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
        })
    }

    /// Count matching issues without fetching rows (`limit=1`, read
    /// `total_count`). Always reflects live tracker state.
    pub async fn count_issues(&self, filters: &IssueFilters) -> Result<u64, RedmineError> {
        let mut query = filters.to_query();
        query.push(("limit".to_string(), "1".to_string()));
        let page: CountDto = self.get_json("/issues.json", &query).await?;
        Ok(page.total_count)
    }

    /// Fetch one bounded page of matching issues plus the total count.
    /// Used by the listing tool, which never needs the whole table.
    pub async fn list_issues(
        &self,
        filters: &IssueFilters,
        limit: u64,
    ) -> Result<(Vec<IssueRecord>, u64), RedmineError> {
        let mut query = filters.to_query();
        query.push(("limit".to_string(), limit.clamp(1, PAGE_SIZE).to_string()));
        let page: IssuesPageDto = self.get_json("/issues.json", &query).await?;
        let records = page.issues.into_iter().map(|dto| dto.into_record()).collect();
        Ok((records, page.total_count))
    }

    /// Fetch all matching issues, paging at 100 rows until the tracker's
    /// `total_count` is reached or the configured cap cuts the fetch short.
    pub async fn fetch_issues(&self, filters: &IssueFilters) -> Result<IssueFetch, RedmineError> {
        let mut records: Vec<IssueRecord> = Vec::new();
        let mut total_count = 0u64;
        let mut offset = 0u64;

        loop {
            let remaining = self.max_issues.saturating_sub(records.len());
            if remaining == 0 {
                break;
            }
            let limit = PAGE_SIZE.min(remaining as u64);

            let mut query = filters.to_query();
            query.push(("offset".to_string(), offset.to_string()));
            query.push(("limit".to_string(), limit.to_string()));

            let page: IssuesPageDto = self.get_json("/issues.json", &query).await?;
            total_count = page.total_count;
            let returned = page.issues.len() as u64;
            records.extend(page.issues.into_iter().map(|dto| dto.into_record()));

            offset += returned;
            if returned == 0 || offset >= total_count {
                break;
            }
        }

        let truncated = (records.len() as u64) < total_count;
        Ok(IssueFetch { records, total_count, truncated })
    }

    /// Fetch one issue with its change journal. Returns the record plus the
    /// raw status transitions found in the journal.
    pub async fn fetch_issue_with_journals(
        &self,
        issue_id: i64,
    ) -> Result<(IssueRecord, Vec<StatusChange>), RedmineError> {
        let path = format!("/issues/{issue_id}.json");
        let query = vec![("include".to_string(), "journals".to_string())];
        let single: SingleIssueDto = self.get_json(&path, &query).await?;
        let changes = single
            .issue
            .journals
            .as_deref()
            .map(status_changes)
            .unwrap_or_default();
        Ok((single.issue.into_record(), changes))
    }

    /// List all projects visible to the credential.
    pub async fn fetch_projects(&self) -> Result<Vec<ProjectRecord>, RedmineError> {
        let mut records = Vec::new();
        let mut offset = 0u64;
        loop {
            let query = vec![
                ("offset".to_string(), offset.to_string()),
                ("limit".to_string(), PAGE_SIZE.to_string()),
            ];
            let page: ProjectsPageDto = self.get_json("/projects.json", &query).await?;
            let returned = page.projects.len() as u64;
            records.extend(page.projects.into_iter().map(|dto| dto.into_record()));
            offset += returned;
            if returned == 0 || offset >= page.total_count {
                break;
            }
        }
        Ok(records)
    }

    /// List versions (sprints) for one project.
    pub async fn fetch_versions(&self, project_id: i64) -> Result<Vec<VersionRecord>, RedmineError> {
        let path = format!("/projects/{project_id}/versions.json");
        let versions: VersionsDto = self.get_json(&path, &[]).await?;
        Ok(versions.versions.into_iter().map(|dto| dto.into_record()).collect())
    }

    /// List users. Deployments commonly deny this endpoint to API keys; the
    /// caller records the failure as a partial-data marker.
    pub async fn fetch_users(&self) -> Result<Vec<UserRecord>, RedmineError> {
        let mut records = Vec::new();
        let mut offset = 0u64;
        loop {
            let query = vec![
                ("offset".to_string(), offset.to_string()),
                ("limit".to_string(), PAGE_SIZE.to_string()),
            ];
            let page: UsersPageDto = self.get_json("/users.json", &query).await?;
            let returned = page.users.len() as u64;
            records.extend(page.users.into_iter().map(|dto| dto.into_record()));
            offset += returned;
            if returned == 0 || offset >= page.total_count {
                break;
            }
        }
        Ok(records)
    }

    /// List one of the tracker's enum tables (statuses, trackers,
    /// priorities).
    pub async fn fetch_enumeration(&self, kind: EnumKind) -> Result<Vec<EnumValue>, RedmineError> {
        let value: serde_json::Value = self.get_json(kind.path(), &[]).await?;
        let list = value
            .get(kind.list_key())
            .cloned()
            .ok_or_else(|| RedmineError::Malformed(format!("missing {} key", kind.list_key())))?;
        serde_json::from_value(list).map_err(|e| RedmineError::Malformed(e.to_string()))
    }

    /// One authenticated GET with bounded retries on transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, RedmineError> {
        let mut attempt = 0u32;
        loop {
            match self.get_json_once(path, query).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                    let mut delay = BACKOFF_BASE * 2u32.pow(attempt);
                    if let RedmineError::RateLimited { retry_after: Some(secs) } = &err {
                        delay = delay.max(Duration::from_secs(*secs));
                    }
                    let delay = delay.min(BACKOFF_CAP);
                    tracing::warn!(
                        path,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "tracker call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, RedmineError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RedmineError::Unreachable("client shut down".to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header("X-Redmine-API-Key", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| RedmineError::Unreachable(e.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            200 => response
                .json::<T>()
                .await
                .map_err(|e| RedmineError::Malformed(e.to_string())),
            401 => Err(RedmineError::Unauthorized),
            403 => Err(RedmineError::Forbidden),
            404 => Err(RedmineError::NotFound),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                Err(RedmineError::RateLimited { retry_after })
            }
            code if status.is_server_error() => {
                Err(RedmineError::Unreachable(format!("server error {code}")))
            }
            code => Err(RedmineError::Malformed(format!("unexpected status {code}"))),
        }
    }
}

impl std::fmt::Debug for RedmineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedmineClient")
            .field("base_url", &self.base_url)
            .field("max_issues", &self.max_issues)
            .finish_non_exhaustive()
    }
}
