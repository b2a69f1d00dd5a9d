//! HTTP integration tests exercising the full API surface (SPEC_FULL §10.4).

mod helpers;

use axum::http::StatusCode;
use helpers::TestHarness;
use std::time::Duration;

#[tokio::test]
async fn health_and_info_are_public() {
    let harness = TestHarness::new();

    let health = harness.request("GET", "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.json["status"], "healthy");

    let info = harness.request("GET", "/api/info", None, None).await;
    assert_eq!(info.status, StatusCode::OK);
    assert_eq!(info.json["data"]["name"], "dsearch-server");
}

#[tokio::test]
async fn search_without_key_is_unauthenticated() {
    let harness = TestHarness::new();
    let resp = harness
        .request(
            "POST",
            "/api/v1/searcher/search",
            None,
            Some(serde_json::json!({"query": "x", "search_type": "keyword"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json["success"], false);
}

/// Spec scenario S1: register a directory, index it, then find a keyword
/// match by display name at rank 1.
#[tokio::test]
async fn register_then_search_finds_keyword_match() {
    let harness = TestHarness::new();
    let docs_dir = tempfile::tempdir().unwrap();
    std::fs::write(docs_dir.path().join("a.txt"), "Python is a language. Python is great.").unwrap();
    std::fs::write(docs_dir.path().join("b.txt"), "Java is an object-oriented language.").unwrap();

    let key = harness.create_key("ci", &["index", "search"]).await;
    let path = docs_dir.path().to_str().unwrap();

    let add = harness
        .request("POST", &format!("/api/v1/directories/add?path={path}"), Some(&key), None)
        .await;
    assert_eq!(add.status, StatusCode::OK, "{:?}", add.json);

    let refresh = harness
        .request("POST", &format!("/api/v1/directories/refresh/{path}"), Some(&key), None)
        .await;
    assert_eq!(refresh.status, StatusCode::OK, "{:?}", refresh.json);

    // Poll status until indexed (spec §6 "Directories" status polling).
    let mut indexed = false;
    for _ in 0..100 {
        let status = harness
            .request("GET", &format!("/api/v1/directories/status/{path}"), Some(&key), None)
            .await;
        if status.json["data"]["status"] == "indexed" {
            indexed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(indexed, "directory never reached indexed status");

    let search = harness
        .request(
            "POST",
            "/api/v1/searcher/search",
            Some(&key),
            Some(serde_json::json!({"query": "python", "search_type": "keyword", "limit": 10})),
        )
        .await;
    assert_eq!(search.status, StatusCode::OK, "{:?}", search.json);
    let results = search.json["data"]["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["display_name"], "a.txt");
}

/// Spec scenario S6: permission-scoped keys are rejected on out-of-scope
/// routes, accepted on in-scope ones, and revocation is immediate.
#[tokio::test]
async fn api_key_lifecycle_enforces_permissions_and_revocation() {
    let harness = TestHarness::new();
    let key = harness.create_key("search-only", &["search"]).await;

    let add = harness
        .request("POST", "/api/v1/directories/add?path=/tmp", Some(&key), None)
        .await;
    assert_eq!(add.status, StatusCode::FORBIDDEN);

    let search = harness
        .request(
            "POST",
            "/api/v1/searcher/search",
            Some(&key),
            Some(serde_json::json!({"query": "anything", "search_type": "keyword"})),
        )
        .await;
    assert_eq!(search.status, StatusCode::OK);

    // Revoke via the admin route, then the same key must be rejected.
    let list = harness.request("GET", "/api/v1/auth/list-keys", Some(helpers::ADMIN_KEY), None).await;
    let key_id = list.json["data"]["keys"]
        .as_array()
        .unwrap()
        .iter()
        .find(|k| k["name"] == "search-only")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let revoke = harness
        .request("DELETE", &format!("/api/v1/auth/revoke-key/{key_id}"), Some(helpers::ADMIN_KEY), None)
        .await;
    assert_eq!(revoke.status, StatusCode::OK);

    let search_after_revoke = harness
        .request(
            "POST",
            "/api/v1/searcher/search",
            Some(&key),
            Some(serde_json::json!({"query": "anything", "search_type": "keyword"})),
        )
        .await;
    assert_eq!(search_after_revoke.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_admin_secret() {
    let harness = TestHarness::new();
    let resp = harness
        .request(
            "POST",
            "/api/v1/auth/create-key",
            Some("not-the-admin-secret"),
            Some(serde_json::json!({"name": "x", "permissions": ["read"]})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn directory_removal_purges_chunks() {
    let harness = TestHarness::new();
    let docs_dir = tempfile::tempdir().unwrap();
    std::fs::write(docs_dir.path().join("c.txt"), "Some searchable content here.").unwrap();
    let key = harness.create_key("ci2", &["index", "search"]).await;
    let path = docs_dir.path().to_str().unwrap();

    harness.request("POST", &format!("/api/v1/directories/add?path={path}"), Some(&key), None).await;
    harness.request("POST", &format!("/api/v1/directories/refresh/{path}"), Some(&key), None).await;

    for _ in 0..100 {
        let status = harness
            .request("GET", &format!("/api/v1/directories/status/{path}"), Some(&key), None)
            .await;
        if status.json["data"]["status"] == "indexed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let remove = harness
        .request("DELETE", &format!("/api/v1/directories/remove/{path}"), Some(&key), None)
        .await;
    assert_eq!(remove.status, StatusCode::OK, "{:?}", remove.json);

    let list = harness.request("GET", "/api/v1/directories/list", Some(&key), None).await;
    let directories = list.json["data"]["directories"].as_array().unwrap();
    assert!(directories.iter().all(|d| d["path"] != path));
}
