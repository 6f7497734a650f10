//! Failure injection against the filesystem store.
//!
//! Covers aborted uploads, captures observed mid-flight, and stored drops
//! that are corrupt or truncated on disk.

use std::io;
use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use deaddrop::DropId;
use tokio::sync::mpsc;

mod common;

use common::{body_json, fs_router, send};

fn published(root: &Path) -> Vec<String> {
    std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != ".staging")
        .collect()
}

fn staged(root: &Path) -> usize {
    std::fs::read_dir(root.join(".staging")).unwrap().count()
}

#[tokio::test]
async fn test_aborted_upload_is_never_published() {
    let dir = tempfile::tempdir().unwrap();
    let router = fs_router(dir.path()).await;

    let parts = vec![
        Ok(Bytes::from_static(b"partial upload")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
    ];
    let response = send(
        &router,
        Request::post("/deaddrop")
            .body(Body::from_stream(futures_util::stream::iter(parts)))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_json(response).await["error"].is_string());
    assert!(published(dir.path()).is_empty());
}

#[tokio::test]
async fn test_capture_in_flight_is_invisible() {
    let dir = tempfile::tempdir().unwrap();
    let router = fs_router(dir.path()).await;

    let (tx, rx) = mpsc::channel::<Bytes>(4);
    let body = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, io::Error>(chunk), rx))
    });

    let capture_router = router.clone();
    let capture = tokio::spawn(async move {
        send(
            &capture_router,
            Request::post("/deaddrop")
                .header("content-type", "text/plain")
                .body(Body::from_stream(body))
                .unwrap(),
        )
        .await
    });

    tx.send(Bytes::from_static(b"half of ")).await.unwrap();
    for _ in 0..100 {
        if staged(dir.path()) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(staged(dir.path()), 1);
    assert!(published(dir.path()).is_empty());

    tx.send(Bytes::from_static(b"the message")).await.unwrap();
    drop(tx);

    let response = capture.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    assert_eq!(published(dir.path()), vec![id.clone()]);
    assert_eq!(staged(dir.path()), 0);

    let response = send(
        &router,
        Request::get(format!("/deaddrop/{}", id)).body(Body::empty()).unwrap(),
    )
    .await;
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"half of the message");
}

#[tokio::test]
async fn test_corrupt_drop_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let router = fs_router(dir.path()).await;

    let id = DropId::generate();
    std::fs::write(dir.path().join(id.as_str()), b"this is not http\r\n\r\n").unwrap();

    let response = send(
        &router,
        Request::get(format!("/deaddrop/{}", id)).body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await;
    assert!(error["error"]
        .as_str()
        .unwrap()
        .starts_with("stored drop is malformed"));
}

#[tokio::test]
async fn test_truncated_drop_aborts_the_stream() {
    let dir = tempfile::tempdir().unwrap();
    let router = fs_router(dir.path()).await;

    let id = DropId::generate();
    std::fs::write(
        dir.path().join(id.as_str()),
        b"POST /deaddrop HTTP/1.1\r\nContent-Length: 100\r\n\r\nonly ten b",
    )
    .unwrap();

    let response = send(
        &router,
        Request::get(format!("/deaddrop/{}", id)).body(Body::empty()).unwrap(),
    )
    .await;

    // headers are already committed by the time the body runs short
    assert_eq!(response.status(), StatusCode::OK);
    assert!(axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .is_err());
}

#[tokio::test]
async fn test_stale_staging_is_swept_on_open() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".staging")).unwrap();
    std::fs::write(dir.path().join(".staging").join("leftover"), b"junk").unwrap();

    let mut config = common::test_config(dir.path());
    config.storage.staging_max_age_secs = 0;
    let store = deaddrop::open_store(&config.storage).await.unwrap();

    assert_eq!(staged(dir.path()), 0);
    drop(store);
}

#[tokio::test]
async fn test_slow_upload_outlasts_request_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(dir.path());
    config.timeouts.request_secs = 1;
    let router =
        deaddrop::HttpServer::new(config, common::fs_store(dir.path()).await).router();

    let body = futures_util::stream::unfold(0u8, |sent| async move {
        if sent == 3 {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(600)).await;
        Some((Ok::<_, io::Error>(Bytes::from(vec![b'a' + sent; 4])), sent + 1))
    });

    let response = send(
        &router,
        Request::post("/deaddrop")
            .body(Body::from_stream(body))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &router,
        Request::get(format!("/deaddrop/{}", id)).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"aaaabbbbcccc");
}
