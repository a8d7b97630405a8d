// crates/core/src/cache/engine.rs
//! Snapshot lifecycle: enable/disable, atomic replacement, coalesced
//! refresh, stale-while-revalidate reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use redmine_copilot_types::{EndpointError, Snapshot, SnapshotCounts};
use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::error::{CacheError, RedmineError};
use crate::redmine::{IssueFilters, RedmineClient, StatusFilter};

/// Completion signal for a refresh. `None` until the refresh finishes.
type RefreshResult = Option<Result<(), String>>;

/// Cache state as reported by the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub enabled: bool,
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<SnapshotCounts>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub endpoint_errors: Vec<EndpointError>,
    pub issues_truncated: bool,
}

/// Holds the current snapshot and serves refreshes.
///
/// The snapshot cell uses `std::sync::RwLock` (not `tokio::sync::RwLock`):
/// it is only ever held long enough to clone or replace an `Arc`, and never
/// across an `.await` point. Refreshes are singleton: a second refresh
/// started while one is in flight joins the in-flight one's completion via
/// a `watch` channel instead of fetching again.
pub struct CacheEngine {
    client: Arc<RedmineClient>,
    ttl: Duration,
    enabled: AtomicBool,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    inflight: Mutex<Option<watch::Receiver<RefreshResult>>>,
}

impl CacheEngine {
    pub fn new(client: Arc<RedmineClient>, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            enabled: AtomicBool::new(false),
            snapshot: RwLock::new(None),
            inflight: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enable the cache and run a refresh. Idempotent: an already-enabled
    /// cache just refreshes (coalescing with any in-flight refresh).
    pub async fn enable(self: &Arc<Self>) -> Result<(), CacheError> {
        self.enabled.store(true, Ordering::Release);
        self.refresh().await
    }

    /// Drop the snapshot and clear the enabled flag. An in-flight refresh
    /// finishes its fetch but will not install a snapshot afterwards.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        match self.snapshot.write() {
            Ok(mut cell) => *cell = None,
            Err(e) => tracing::error!("snapshot lock poisoned on disable: {e}"),
        }
    }

    /// Build a new snapshot and swap it in atomically. A failed refresh
    /// leaves the previous snapshot intact. Concurrent callers coalesce onto
    /// one fetch and all observe its result.
    pub async fn refresh(self: &Arc<Self>) -> Result<(), CacheError> {
        if !self.is_enabled() {
            return Err(CacheError::Disabled);
        }

        let mut rx = {
            let mut inflight = self.inflight.lock().await;
            match inflight.as_ref() {
                Some(rx) => rx.clone(),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *inflight = Some(rx.clone());
                    // The fetch runs in its own task so a cancelled caller
                    // can never wedge the in-flight cell.
                    let engine = Arc::clone(self);
                    tokio::spawn(async move {
                        let result = engine.build_and_install().await;
                        *engine.inflight.lock().await = None;
                        let _ = tx.send(Some(result.map_err(|e| e.to_string())));
                    });
                    rx
                }
            }
        };

        loop {
            if let Some(result) = rx.borrow_and_update().clone() {
                return result.map_err(CacheError::Refresh);
            }
            if rx.changed().await.is_err() {
                return Err(CacheError::Refresh("refresh task aborted".to_string()));
            }
        }
    }

    /// Current snapshot for an aggregation call. A stale snapshot is
    /// returned immediately while a background refresh is kicked off
    /// (stale-while-revalidate).
    pub fn read(self: &Arc<Self>) -> Result<Arc<Snapshot>, CacheError> {
        if !self.is_enabled() {
            return Err(CacheError::Disabled);
        }
        let snapshot = self
            .current()
            .ok_or(CacheError::Unavailable)?;

        if snapshot.age_seconds(Utc::now()) > self.ttl.as_secs() {
            tracing::debug!(age_s = snapshot.age_seconds(Utc::now()), "snapshot stale, revalidating");
            let engine = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = engine.refresh().await {
                    tracing::warn!(error = %e, "background revalidation failed");
                }
            });
        }
        Ok(snapshot)
    }

    pub fn status(&self) -> CacheStatus {
        let snapshot = self.current();
        let now = Utc::now();
        CacheStatus {
            enabled: self.is_enabled(),
            initialized: snapshot.is_some(),
            last_updated: snapshot.as_ref().map(|s| s.fetched_at),
            age_seconds: snapshot.as_ref().map(|s| s.age_seconds(now)),
            counts: snapshot.as_ref().map(|s| s.counts()),
            endpoint_errors: snapshot
                .as_ref()
                .map(|s| s.endpoint_errors.clone())
                .unwrap_or_default(),
            issues_truncated: snapshot.as_ref().is_some_and(|s| s.issues_truncated),
        }
    }

    fn current(&self) -> Option<Arc<Snapshot>> {
        match self.snapshot.read() {
            Ok(cell) => cell.clone(),
            Err(e) => {
                tracing::error!("snapshot lock poisoned on read: {e}");
                None
            }
        }
    }

    async fn build_and_install(&self) -> Result<(), RedmineError> {
        let snapshot = self.build_snapshot().await?;
        if !self.is_enabled() {
            tracing::info!("cache disabled during refresh, discarding snapshot");
            return Ok(());
        }
        tracing::info!(
            issues = snapshot.issues.len(),
            projects = snapshot.projects.len(),
            versions = snapshot.versions.len(),
            users = snapshot.users.len(),
            truncated = snapshot.issues_truncated,
            "snapshot installed"
        );
        match self.snapshot.write() {
            Ok(mut cell) => *cell = Some(Arc::new(snapshot)),
            Err(e) => tracing::error!("snapshot lock poisoned on install: {e}"),
        }
        Ok(())
    }

    /// Fetch all tables. The issues table is required; projects, versions,
    /// and users degrade to partial-data markers so a denied endpoint never
    /// fails the refresh.
    async fn build_snapshot(&self) -> Result<Snapshot, RedmineError> {
        let mut endpoint_errors: Vec<EndpointError> = Vec::new();

        let issue_fetch = self
            .client
            .fetch_issues(&IssueFilters::default().with_status(StatusFilter::All))
            .await?;

        let projects = match self.client.fetch_projects().await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!(error = %e, "projects endpoint unavailable");
                endpoint_errors.push(EndpointError {
                    endpoint: "projects".to_string(),
                    status: e.marker_status(),
                });
                Vec::new()
            }
        };

        // Versions are listed per project; fall back to the project ids seen
        // on issues when the project listing itself was denied.
        let mut project_ids: Vec<i64> = projects.iter().map(|p| p.id).collect();
        if project_ids.is_empty() {
            project_ids = issue_fetch.records.iter().map(|i| i.project_id).collect();
            project_ids.sort_unstable();
            project_ids.dedup();
        }

        let mut versions = Vec::new();
        let mut versions_failed = false;
        for project_id in project_ids {
            match self.client.fetch_versions(project_id).await {
                Ok(list) => versions.extend(list),
                Err(e) => {
                    if !versions_failed {
                        tracing::warn!(project_id, error = %e, "versions endpoint unavailable");
                        endpoint_errors.push(EndpointError {
                            endpoint: "versions".to_string(),
                            status: e.marker_status(),
                        });
                        versions_failed = true;
                    }
                }
            }
        }

        let users = match self.client.fetch_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(error = %e, "users endpoint unavailable");
                endpoint_errors.push(EndpointError {
                    endpoint: "users".to_string(),
                    status: e.marker_status(),
                });
                Vec::new()
            }
        };

        Ok(Snapshot {
            issues: issue_fetch.records,
            projects,
            versions,
            users,
            fetched_at: Utc::now(),
            issues_truncated: issue_fetch.truncated,
            endpoint_errors,
        })
    }
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("ttl_s", &self.ttl.as_secs())
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
