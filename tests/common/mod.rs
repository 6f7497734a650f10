//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use deaddrop::config::{DeadDropConfig, StorageBackendKind};
use deaddrop::http::HttpServer;
use deaddrop::lifecycle::Shutdown;
use deaddrop::storage::{DropStore, FsStore, MemoryStore};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

/// Config suitable for tests: no web UI, loopback listener.
pub fn test_config(root: &Path) -> DeadDropConfig {
    let mut config = DeadDropConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.static_files.enabled = false;
    config.storage.backend = StorageBackendKind::Fs;
    config.storage.root = root.to_path_buf();
    config
}

pub async fn fs_store(root: &Path) -> Arc<dyn DropStore> {
    Arc::new(FsStore::open(root).await.unwrap())
}

pub fn memory_router() -> Router {
    let config = test_config(Path::new("/unused"));
    HttpServer::new(config, Arc::new(MemoryStore::new())).router()
}

pub async fn fs_router(root: &Path) -> Router {
    HttpServer::new(test_config(root), fs_store(root).await).router()
}

/// Drive one request through the router.
pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// POST a drop and return its ID.
pub async fn capture(router: &Router, request: Request<Body>) -> String {
    let response = send(router, request).await;
    assert_eq!(response.status(), 200);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Start a real server on an ephemeral port.
pub async fn start_server(config: DeadDropConfig, store: Arc<dyn DropStore>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}
