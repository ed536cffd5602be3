#![allow(dead_code)]

use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;

use bulletin_api::middleware::WritePolicy;
use bulletin_api::router::router;
use bulletin_api::state::{AppState, AppStateInner};
use bulletin_api::token::TokenIssuer;
use bulletin_db::Database;
use bulletin_gateway::hub::Hub;

pub const TEST_SECRET: &str = "test-secret";

pub fn test_state(write_policy: WritePolicy) -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("in-memory db"),
        tokens: TokenIssuer::new(TEST_SECRET, None),
        hub: Hub::new(),
        write_policy,
    })
}

/// A throwaway SPA directory containing only `index.html`. Removed when
/// the returned guard drops.
pub fn static_dir() -> TempDir {
    let dir = tempfile::Builder::new()
        .prefix("bulletin-spa-")
        .tempdir()
        .expect("create static dir");
    std::fs::write(dir.path().join("index.html"), "<!doctype html><title>bulletin</title>")
        .expect("write index.html");
    dir
}

/// Router plus the static directory it serves; the directory lives as long
/// as this value.
pub struct TestApp {
    pub router: Router,
    static_dir: TempDir,
}

impl TestApp {
    pub fn static_path(&self) -> &std::path::Path {
        self.static_dir.path()
    }
}

impl Deref for TestApp {
    type Target = Router;

    fn deref(&self) -> &Router {
        &self.router
    }
}

pub fn app(state: AppState) -> TestApp {
    let static_dir = static_dir();
    let router = router(state, static_dir.path());
    TestApp { router, static_dir }
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn post_json_with_token(uri: &str, body: Value, token: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

/// Serve `state` on an ephemeral port until the returned sender fires.
pub async fn spawn_server(state: AppState) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let TestApp { router, static_dir } = app(state);

    tokio::spawn(async move {
        // Keep the static directory until the server stops
        let _static_dir = static_dir;
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    (addr, shutdown_tx)
}

/// Poll until the hub reports `expected` live subscribers.
pub async fn wait_for_subscribers(hub: &Hub, expected: usize) {
    for _ in 0..200 {
        if hub.subscriber_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} subscribers, hub has {}",
        expected,
        hub.subscriber_count()
    );
}
