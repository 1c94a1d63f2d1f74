//! Common test utilities for the rampart binary crate

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, StatusCode},
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceExt;

use rampart::{AppHandle, Config, create_app};
use rampart_core::config::StoreBackend;

pub const BROWSER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Start a throwaway upstream application on a random local port
pub async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/api/hello", get(|| async { "hello from upstream" }))
        .route("/api/echo", post(|body: String| async move { body }))
        .route(
            "/api/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/api/missing",
            get(|| async { (StatusCode::NOT_FOUND, "nope") }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn config_for(upstream_url: String) -> Config {
    let mut config = Config::default();
    config.store.backend = StoreBackend::Memory;
    config.upstream.url = upstream_url;
    config.upstream.timeout_seconds = 2;
    config
}

pub async fn app_for(upstream_url: String) -> AppHandle {
    create_app(config_for(upstream_url)).await.unwrap()
}

pub async fn send(app: &AppHandle, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

pub fn browser(method: &str, uri: &str, body: Body) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("user-agent", BROWSER_AGENT)
        .header("accept", "text/html,application/json;q=0.9")
        .header("accept-language", "en-US,en;q=0.8")
        .header("accept-encoding", "gzip, br")
        .header("referer", "https://example.test/")
        .body(body)
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([203, 0, 113, 200], 40_000))));
    request
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
