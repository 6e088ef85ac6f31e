//! Integration tests for `SonarQubeSource` using wiremock HTTP mocks.
//!
//! Each test stands up a local server, so no real network traffic is made.

use std::time::Duration;

use reportgate_core::MetricValue;
use reportgate_source::{
    fetch_collection, Credential, Pagination, ReportSource, SonarQubeSource, SourceError,
    SourceErrorKind, SourceHttp,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_source(base_url: &str) -> SonarQubeSource {
    let http = SourceHttp::new(
        base_url,
        Credential::bearer("squ_test"),
        Duration::from_secs(5),
        "reportgate-test/0.1",
    )
    .expect("client construction should not fail");
    SonarQubeSource::new(http)
}

fn pagination(page_size: u32) -> Pagination {
    Pagination {
        page_size,
        max_pages: 10,
        include_restricted: true,
    }
}

async fn mount_valid_probe(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/authentication/validate"))
        .and(header("authorization", "Bearer squ_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid": true})))
        .mount(server)
        .await;
}

fn projects_page(keys: &[&str], total: u64) -> serde_json::Value {
    let components: Vec<serde_json::Value> = keys
        .iter()
        .map(|k| json!({"key": k, "name": format!("Project {k}"), "qualifier": "TRK", "visibility": "public"}))
        .collect();
    json!({
        "paging": {"pageIndex": 1, "pageSize": 2, "total": total},
        "components": components
    })
}

#[tokio::test]
async fn fetch_collection_pages_through_projects_in_order() {
    let server = MockServer::start().await;
    mount_valid_probe(&server).await;

    for (page, keys) in [("1", vec!["a", "b"]), ("2", vec!["c", "d"]), ("3", vec!["e"])] {
        Mock::given(method("GET"))
            .and(path("/api/projects/search"))
            .and(query_param("p", page))
            .and(query_param("ps", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(projects_page(&keys, 5)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let source = test_source(&server.uri());
    let items = fetch_collection(&source, &pagination(2))
        .await
        .expect("listing should succeed");

    let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, ["a", "b", "c", "d", "e"]);
    assert_eq!(items[0].display_name, "Project a");
}

#[tokio::test]
async fn invalid_token_fails_before_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/authentication/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid": false})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/projects/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(projects_page(&["a"], 1)))
        .expect(0)
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let err = fetch_collection(&source, &pagination(2)).await.unwrap_err();

    assert_eq!(err.kind(), SourceErrorKind::Authentication, "got: {err:?}");
}

#[tokio::test]
async fn http_401_maps_to_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/authentication/validate"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let err = source.probe().await.unwrap_err();
    assert!(
        matches!(err, SourceError::Authentication { .. }),
        "expected Authentication, got: {err:?}"
    );
}

#[tokio::test]
async fn malformed_listing_is_an_unexpected_response() {
    let server = MockServer::start().await;
    mount_valid_probe(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/projects/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let err = fetch_collection(&source, &pagination(2)).await.unwrap_err();

    assert!(
        matches!(err, SourceError::Deserialize { .. }),
        "expected Deserialize, got: {err:?}"
    );
    assert_eq!(err.kind(), SourceErrorKind::UnexpectedResponse);
}

#[tokio::test]
async fn server_error_is_an_unexpected_status() {
    let server = MockServer::start().await;
    mount_valid_probe(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/projects/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let err = fetch_collection(&source, &pagination(2)).await.unwrap_err();
    assert!(
        matches!(err, SourceError::UnexpectedStatus { status: 503, .. }),
        "expected UnexpectedStatus(503), got: {err:?}"
    );
}

#[tokio::test]
async fn unreachable_server_is_a_connectivity_error() {
    // Port 9 (discard) on localhost is not expected to accept HTTP.
    let source = test_source("http://127.0.0.1:9");
    let err = source.probe().await.unwrap_err();
    assert_eq!(err.kind(), SourceErrorKind::Connectivity, "got: {err:?}");
}

#[tokio::test]
async fn slow_server_times_out_as_connectivity_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/authentication/validate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"valid": true}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let http = SourceHttp::new(
        &server.uri(),
        Credential::bearer("squ_test"),
        Duration::from_millis(200),
        "reportgate-test/0.1",
    )
    .unwrap();
    let source = SonarQubeSource::new(http);

    let err = source.probe().await.unwrap_err();
    assert_eq!(err.kind(), SourceErrorKind::Connectivity, "got: {err:?}");
}

#[tokio::test]
async fn duplicate_keys_within_a_cycle_are_rejected() {
    let server = MockServer::start().await;
    mount_valid_probe(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/projects/search"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(projects_page(&["a", "a"], 2)))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let err = fetch_collection(&source, &pagination(5)).await.unwrap_err();
    assert!(
        matches!(err, SourceError::DuplicateKey { ref key, .. } if key == "a"),
        "expected DuplicateKey(a), got: {err:?}"
    );
}

#[tokio::test]
async fn fetch_detail_maps_measures_and_latest_analysis() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/measures/component"))
        .and(query_param("component", "svc-api"))
        .and(query_param(
            "metricKeys",
            "ncloc,bugs,vulnerabilities,code_smells,coverage",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "component": {
                "key": "svc-api",
                "name": "Service API",
                "measures": [
                    {"metric": "ncloc", "value": "12034"},
                    {"metric": "bugs", "value": "3"},
                    {"metric": "coverage", "value": "81.4"},
                    {"metric": "new_bugs", "period": {"index": 1, "value": "0"}}
                ]
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/project_analyses/search"))
        .and(query_param("project", "svc-api"))
        .and(query_param("ps", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paging": {"pageIndex": 1, "pageSize": 1, "total": 40},
            "analyses": [{"key": "AX1", "date": "2025-01-20T10:11:12+0000", "events": []}]
        })))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let item = reportgate_core::SourceItem::new("svc-api", "Service API");
    let metrics = source.fetch_detail(&item).await.expect("detail should parse");

    assert_eq!(metrics["ncloc"], MetricValue::present("12034"));
    assert_eq!(metrics["bugs"], MetricValue::present("3"));
    assert_eq!(metrics["coverage"], MetricValue::present("81.4"));
    assert_eq!(
        metrics["last_analysis"],
        MetricValue::present("2025-01-20T10:11:12+0000")
    );
    assert!(!metrics.contains_key("vulnerabilities"));
    assert!(!metrics.contains_key("new_bugs"));
}

#[tokio::test]
async fn never_analysed_project_has_absent_analysis_date() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/measures/component"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "component": {"key": "fresh", "name": "Fresh", "measures": []}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/project_analyses/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paging": {"pageIndex": 1, "pageSize": 1, "total": 0},
            "analyses": []
        })))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let item = reportgate_core::SourceItem::new("fresh", "Fresh");
    let metrics = source.fetch_detail(&item).await.unwrap();

    assert_eq!(metrics["last_analysis"], MetricValue::Absent);
}

#[tokio::test]
async fn private_projects_are_flagged_restricted() {
    let server = MockServer::start().await;
    mount_valid_probe(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/projects/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paging": {"pageIndex": 1, "pageSize": 100, "total": 2},
            "components": [
                {"key": "open", "name": "Open", "visibility": "public"},
                {"key": "secret", "name": "Secret", "visibility": "private"}
            ]
        })))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let mut config = pagination(100);
    config.include_restricted = false;
    let items = fetch_collection(&source, &config).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key, "open");
}
