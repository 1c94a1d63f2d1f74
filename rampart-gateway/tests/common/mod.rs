//! Common test utilities for rampart-gateway

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, StatusCode},
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tower::ServiceExt;

use rampart_core::Config;
use rampart_core::application::StoreError;
use rampart_core::config::StoreBackend;
use rampart_core::infrastructure::{InMemoryStore, SharedStore};
use rampart_gateway::{GatewayState, create_router};

pub const ADMIN_TOKEN: &str = "test-admin-token";

pub const BROWSER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.store.backend = StoreBackend::Memory;
    config.admin.bearer_token = Some(ADMIN_TOKEN.to_string());
    config
}

/// Stand-in application behind the gateway
pub struct TestApp {
    pub state: GatewayState,
    pub router: Router,
    /// Makes `/api/report` answer 500 while set
    pub report_failing: Arc<AtomicBool>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_store(config, Arc::new(InMemoryStore::new()))
    }

    pub fn with_store(config: Config, store: Arc<dyn SharedStore>) -> Self {
        let state = GatewayState::new(config, store);
        let report_failing = Arc::new(AtomicBool::new(false));

        let failing = report_failing.clone();
        let application = Router::new()
            .route(
                "/api/posts",
                get(|| async { Json(serde_json::json!({ "posts": ["hello"] })) })
                    .post(|| async { StatusCode::CREATED }),
            )
            .route(
                "/api/auth/login",
                axum::routing::post(|| async { Json(serde_json::json!({ "ok": true })) }),
            )
            .route(
                "/api/report",
                get(move || {
                    let failing = failing.clone();
                    async move {
                        if failing.load(Ordering::SeqCst) {
                            (
                                StatusCode::INTERNAL_SERVER_ERROR,
                                Json(serde_json::json!({ "error": "database down" })),
                            )
                        } else {
                            (
                                StatusCode::OK,
                                Json(serde_json::json!({ "total": 42 })),
                            )
                        }
                    }
                }),
            )
            .route("/robots.txt", get(|| async { "User-agent: *" }));

        Self {
            router: create_router(state.clone(), application),
            state,
            report_failing,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Attach the socket address axum records for a connection from `ip`
pub fn from_peer(mut request: Request<Body>, ip: &str) -> Request<Body> {
    let addr = SocketAddr::new(ip.parse().unwrap(), 40_000);
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

/// Request carrying the headers a real browser sends, connecting from `ip`
pub fn browser(method: &str, uri: &str, ip: &str) -> Request<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("user-agent", BROWSER_AGENT)
        .header("accept", "text/html,application/json;q=0.9")
        .header("accept-language", "en-US,en;q=0.8")
        .header("accept-encoding", "gzip, br")
        .header("referer", "https://example.test/")
        .body(Body::empty())
        .unwrap();
    from_peer(request, ip)
}

pub fn admin(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", ADMIN_TOKEN));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Store whose every operation fails as if Redis were down
#[derive(Debug, Default)]
pub struct FailingStore;

fn down<T>() -> Result<T, StoreError> {
    Err(StoreError::unavailable("connection refused"))
}

#[async_trait]
impl SharedStore for FailingStore {
    async fn incr(&self, _key: &str, _ttl: Option<Duration>) -> Result<i64, StoreError> {
        down()
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        down()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), StoreError> {
        down()
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        down()
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, StoreError> {
        down()
    }

    async fn push_capped(&self, _key: &str, _value: &str, _max_len: usize) -> Result<(), StoreError> {
        down()
    }

    async fn list_range(&self, _key: &str, _limit: usize) -> Result<Vec<String>, StoreError> {
        down()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        down()
    }
}

/// In-memory store whose writes hang, as a saturated Redis would
#[derive(Debug, Default)]
pub struct StalledWriteStore {
    inner: InMemoryStore,
}

#[async_trait]
impl SharedStore for StalledWriteStore {
    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError> {
        self.inner.incr(key, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        self.inner.ttl(key).await
    }

    async fn push_capped(&self, key: &str, value: &str, max_len: usize) -> Result<(), StoreError> {
        self.inner.push_capped(key, value, max_len).await
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        self.inner.list_range(key, limit).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}
