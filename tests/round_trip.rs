//! Capture then replay through the router.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use deaddrop::storage::DropStore;
use deaddrop::{DropId, HttpServer, MemoryStore};
use tokio::io::AsyncReadExt;

mod common;

use common::{body_bytes, body_json, capture, header, memory_router, send};

#[tokio::test]
async fn test_body_and_content_type_round_trip() {
    let router = memory_router();
    let payload: Vec<u8> = (0..=255u8).cycle().take(300_000).collect();

    let id = capture(
        &router,
        Request::post("/deaddrop")
            .header("content-type", "image/png")
            .header("content-length", payload.len())
            .body(Body::from(payload.clone()))
            .unwrap(),
    )
    .await;

    let response = send(
        &router,
        Request::get(format!("/deaddrop/{}", id)).body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("image/png"));
    assert_eq!(
        header(&response, "content-length"),
        Some(payload.len().to_string().as_str())
    );
    assert_eq!(
        header(&response, "content-disposition"),
        Some(format!("attachment; filename={}.png", id).as_str())
    );
    assert_eq!(body_bytes(response).await, payload);
}

#[tokio::test]
async fn test_disposition_filename_is_authoritative() {
    let router = memory_router();
    let id = capture(
        &router,
        Request::post("/deaddrop")
            .header("content-type", "application/pdf")
            .header("content-disposition", "attachment; filename=\"report.pdf\"")
            .body(Body::from("%PDF-1.7"))
            .unwrap(),
    )
    .await;

    let response = send(
        &router,
        Request::get(format!("/deaddrop/{}", id)).body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(
        header(&response, "content-disposition"),
        Some("attachment; filename=report.pdf")
    );
    assert_eq!(body_bytes(response).await, b"%PDF-1.7");
}

#[tokio::test]
async fn test_content_type_extension_then_data_fallback() {
    let router = memory_router();

    let pdf = capture(
        &router,
        Request::post("/deaddrop")
            .header("content-type", "application/pdf")
            .body(Body::from("pdf"))
            .unwrap(),
    )
    .await;
    let response = send(
        &router,
        Request::get(format!("/deaddrop/{}", pdf)).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(
        header(&response, "content-disposition"),
        Some(format!("attachment; filename={}.pdf", pdf).as_str())
    );

    let bare = capture(
        &router,
        Request::post("/deaddrop").body(Body::from("who knows")).unwrap(),
    )
    .await;
    let response = send(
        &router,
        Request::get(format!("/deaddrop/{}", bare)).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(
        header(&response, "content-disposition"),
        Some(format!("attachment; filename={}.data", bare).as_str())
    );
    assert_eq!(header(&response, "content-type"), None);
    assert_eq!(body_bytes(response).await, b"who knows");
}

#[tokio::test]
async fn test_malformed_disposition_does_not_fail_replay() {
    let router = memory_router();
    let id = capture(
        &router,
        Request::post("/deaddrop")
            .header("content-type", "application/pdf")
            .header("content-disposition", "attachment; filename=my report.pdf")
            .body(Body::from("data"))
            .unwrap(),
    )
    .await;

    let response = send(
        &router,
        Request::get(format!("/deaddrop/{}", id)).body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header(&response, "content-disposition"),
        Some(format!("attachment; filename={}.pdf", id).as_str())
    );
}

#[tokio::test]
async fn test_extension_suffix_is_ignored_on_lookup() {
    let router = memory_router();
    let id = capture(
        &router,
        Request::post("/deaddrop")
            .header("content-type", "text/csv")
            .body(Body::from("a,b\n1,2\n"))
            .unwrap(),
    )
    .await;

    for path in [
        format!("/deaddrop/{}", id),
        format!("/deaddrop/{}.csv", id),
        format!("/deaddrop/{}.anything.at.all", id),
    ] {
        let response = send(&router, Request::get(path).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"a,b\n1,2\n");
    }
}

#[tokio::test]
async fn test_unknown_and_invalid_ids_are_404() {
    let router = memory_router();

    for path in [
        "/deaddrop/0192f1a2b3c4d5e6f708192a3b4c5d6e",
        "/deaddrop/nope.pdf",
        "/deaddrop/.hidden",
        "/deaddrop/..%2F..%2Fetc%2Fpasswd",
    ] {
        let response = send(&router, Request::get(path).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
        assert_eq!(body_json(response).await["error"], "drop not found");
    }
}

#[tokio::test]
async fn test_chunked_upload_round_trips() {
    let router = memory_router();
    let parts = vec![
        Ok::<_, std::io::Error>(Bytes::from_static(b"first,")),
        Ok(Bytes::from_static(b"second,")),
        Ok(Bytes::from_static(b"third")),
    ];

    let id = capture(
        &router,
        Request::post("/deaddrop")
            .header("content-type", "text/plain")
            .header("transfer-encoding", "chunked")
            .body(Body::from_stream(futures_util::stream::iter(parts)))
            .unwrap(),
    )
    .await;

    let response = send(
        &router,
        Request::get(format!("/deaddrop/{}", id)).body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(header(&response, "content-length"), None);
    assert_eq!(body_bytes(response).await, b"first,second,third");
}

#[tokio::test]
async fn test_replay_is_repeatable() {
    let router = memory_router();
    let id = capture(
        &router,
        Request::post("/deaddrop").body(Body::from("again")).unwrap(),
    )
    .await;

    for _ in 0..3 {
        let response = send(
            &router,
            Request::get(format!("/deaddrop/{}", id)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(body_bytes(response).await, b"again");
    }
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let router = memory_router();
    let response = send(
        &router,
        Request::post("/deaddrop")
            .header("x-request-id", "trace-me")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(header(&response, "x-request-id"), Some("trace-me"));

    let response = send(
        &router,
        Request::get("/deaddrop/missing").body(Body::empty()).unwrap(),
    )
    .await;
    assert!(header(&response, "x-request-id").is_some());
}

async fn stored_bytes(store: &MemoryStore, id: &str) -> Vec<u8> {
    let id = DropId::parse(id).unwrap();
    let mut reader = store.open(&id).await.unwrap();
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw).await.unwrap();
    raw
}

#[tokio::test]
async fn test_stored_drop_holds_exactly_the_sent_request() {
    let store = Arc::new(MemoryStore::new());
    let router =
        HttpServer::new(common::test_config(Path::new("/unused")), store.clone()).router();

    let response = send(
        &router,
        Request::post("/deaddrop?via=test")
            .header("content-type", "text/plain")
            .header("x-tag", "one")
            .header("x-tag", "two")
            .body(Body::from("hi"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    // a request ID is still assigned, just never written into the drop
    assert!(header(&response, "x-request-id").is_some());
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let raw = stored_bytes(&store, &id).await;
    assert_eq!(
        String::from_utf8(raw).unwrap(),
        "POST /deaddrop?via=test HTTP/1.1\r\n\
         Content-Type: text/plain\r\n\
         X-Tag: one\r\n\
         X-Tag: two\r\n\
         \r\n\
         hi"
    );
}

#[tokio::test]
async fn test_client_request_id_is_stored_as_sent() {
    let store = Arc::new(MemoryStore::new());
    let router =
        HttpServer::new(common::test_config(Path::new("/unused")), store.clone()).router();

    let response = send(
        &router,
        Request::post("/deaddrop")
            .header("x-request-id", "from-client")
            .body(Body::from("x"))
            .unwrap(),
    )
    .await;
    assert_eq!(header(&response, "x-request-id"), Some("from-client"));
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let raw = String::from_utf8(stored_bytes(&store, &id).await).unwrap();
    assert_eq!(raw, "POST /deaddrop HTTP/1.1\r\nX-Request-Id: from-client\r\n\r\nx");
}
