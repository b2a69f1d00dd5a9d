//! Test harness — builds a full `axum::Router` over a temp-dir `Engine` and
//! drives it via `tower::ServiceExt::oneshot`, without binding a socket
//! (SPEC_FULL §10.4), mirroring the teacher's `TestHarness` shape
//! (`server/tests/helpers/mod.rs`) adapted from MCP dispatch to HTTP.

use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use dsearch_core::config::Config;
use dsearch_core::Engine;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-secret";
const TEST_ADDR: &str = "127.0.0.1:9999";

pub struct TestHarness {
    pub router: Router,
    pub engine: Arc<Engine>,
    _data_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub json: Value,
}

impl TestHarness {
    pub fn new() -> Self {
        let data_dir = TempDir::new().expect("temp data dir");
        let mut config = Config::default();
        config.data_dir = data_dir.path().to_path_buf();
        config.admin_key = ADMIN_KEY.to_string();
        config.jwt_secret = "test-jwt-secret".to_string();

        let engine = Arc::new(Engine::open(config).expect("engine open"));
        let ctx = dsearch_server::state::AppContext::new(Arc::clone(&engine));
        let router = dsearch_server::router::build(ctx);

        Self { router, engine, _data_dir: data_dir }
    }

    /// Issue a request with no body, injecting a fake `ConnectInfo` the way
    /// `into_make_service_with_connect_info` would at runtime, so handlers
    /// that require it (login/validate-key) still extract cleanly.
    pub async fn request(&self, method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> TestResponse {
        let addr: SocketAddr = TEST_ADDR.parse().unwrap();
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .extension(ConnectInfo(addr));
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        TestResponse { status, json }
    }

    /// Create an API key with the given permissions via the admin route and
    /// return its plaintext secret.
    pub async fn create_key(&self, name: &str, permissions: &[&str]) -> String {
        let body = serde_json::json!({
            "name": name,
            "permissions": permissions,
        });
        let resp = self.request("POST", "/api/v1/auth/create-key", Some(ADMIN_KEY), Some(body)).await;
        assert_eq!(resp.status, StatusCode::OK, "create_key failed: {:?}", resp.json);
        resp.json["data"]["api_key"].as_str().unwrap().to_string()
    }
}
