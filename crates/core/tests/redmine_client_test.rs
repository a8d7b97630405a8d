//! Integration tests for the tracker client against a mock tracker.

use redmine_copilot_core::redmine::{EnumKind, IssueFilters, RedmineClient, StatusFilter};
use redmine_copilot_core::RedmineError;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn issue_json(id: i64, status: &str, status_id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "subject": format!("issue {id}"),
        "project": {"id": 6, "name": "NCEL"},
        "tracker": {"id": 1, "name": "Bug"},
        "status": {"id": status_id, "name": status},
        "priority": {"id": 2, "name": "Normal"},
        "created_on": "2025-05-01T08:00:00Z",
        "updated_on": "2025-05-02T08:00:00Z"
    })
}

async fn client(server: &MockServer) -> RedmineClient {
    RedmineClient::new(server.uri(), "secret-key", 1000).unwrap()
}

#[tokio::test]
async fn test_count_issues_sends_limit_1_and_reads_total_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .and(query_param("project_id", "6"))
        .and(query_param("tracker_id", "1"))
        .and(query_param("status_id", "open"))
        .and(query_param("limit", "1"))
        .and(header("X-Redmine-API-Key", "secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [issue_json(1, "New", 1)],
            "total_count": 310, "offset": 0, "limit": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filters = IssueFilters::project(6)
        .with_tracker(1)
        .with_status(StatusFilter::Open);
    let count = client(&server).await.count_issues(&filters).await.unwrap();
    assert_eq!(count, 310);
}

#[tokio::test]
async fn test_fetch_issues_concatenates_pages() {
    let server = MockServer::start().await;
    let page1: Vec<_> = (1..=100).map(|id| issue_json(id, "New", 1)).collect();
    let page2: Vec<_> = (101..=150).map(|id| issue_json(id, "New", 1)).collect();

    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": page1, "total_count": 150, "offset": 0, "limit": 100
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": page2, "total_count": 150, "offset": 100, "limit": 100
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fetch = client(&server)
        .await
        .fetch_issues(&IssueFilters::default().with_status(StatusFilter::All))
        .await
        .unwrap();
    assert_eq!(fetch.records.len(), 150);
    assert_eq!(fetch.total_count, 150);
    assert!(!fetch.truncated);
    assert_eq!(fetch.records[0].id, 1);
    assert_eq!(fetch.records[149].id, 150);
}

#[tokio::test]
async fn test_fetch_issues_respects_cap_and_flags_truncation() {
    let server = MockServer::start().await;
    let page: Vec<_> = (1..=100).map(|id| issue_json(id, "New", 1)).collect();
    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": page, "total_count": 1500, "offset": 0, "limit": 100
        })))
        .mount(&server)
        .await;

    let client = RedmineClient::new(server.uri(), "secret-key", 100).unwrap();
    let fetch = client
        .fetch_issues(&IssueFilters::default().with_status(StatusFilter::All))
        .await
        .unwrap();
    assert_eq!(fetch.records.len(), 100);
    assert_eq!(fetch.total_count, 1500);
    assert!(fetch.truncated);
}

#[tokio::test]
async fn test_transient_server_error_is_retried() {
    let server = MockServer::start().await;
    // First attempt fails with 500; the retry gets data.
    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [], "total_count": 0, "offset": 0, "limit": 1
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let count = client(&server)
        .await
        .count_issues(&IssueFilters::default())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_forbidden_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users.json"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).await.fetch_users().await.unwrap_err();
    assert!(matches!(err, RedmineError::Forbidden));
}

#[tokio::test]
async fn test_unauthorized_and_not_found_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects.json"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/issues/999.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client(&server).await;
    assert!(matches!(client.fetch_projects().await.unwrap_err(), RedmineError::Unauthorized));
    assert!(matches!(
        client.fetch_issue_with_journals(999).await.unwrap_err(),
        RedmineError::NotFound
    ));
}

#[tokio::test]
async fn test_journals_yield_status_changes() {
    let server = MockServer::start().await;
    let mut issue = issue_json(42, "In Progress", 2);
    issue["journals"] = json!([
        {"details": [
            {"property": "attr", "name": "status_id", "old_value": "5", "new_value": "2"}
        ]},
        {"details": [
            {"property": "attr", "name": "assigned_to_id", "old_value": "1", "new_value": "2"}
        ]}
    ]);
    Mock::given(method("GET"))
        .and(path("/issues/42.json"))
        .and(query_param("include", "journals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"issue": issue})))
        .mount(&server)
        .await;

    let (record, changes) = client(&server).await.fetch_issue_with_journals(42).await.unwrap();
    assert_eq!(record.id, 42);
    assert_eq!(record.status_name, "in_progress");
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].from_status_id, 5);
    assert_eq!(changes[0].to_status_id, 2);
}

#[tokio::test]
async fn test_versions_and_enumerations() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/6/versions.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "versions": [
                {"id": 3, "project": {"id": 6, "name": "NCEL"}, "name": "Week-7",
                 "status": "closed", "due_date": "2025-05-25"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/trackers.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "trackers": [{"id": 1, "name": "Bug"}, {"id": 4, "name": "Story"}]
        })))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let versions = client.fetch_versions(6).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].name, "Week-7");

    let trackers = client.fetch_enumeration(EnumKind::Trackers).await.unwrap();
    assert_eq!(trackers.len(), 2);
    assert_eq!(trackers[0].name, "Bug");
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .count_issues(&IssueFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RedmineError::Malformed(_)));
}
