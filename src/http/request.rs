//! Request ID assignment and propagation.
//!
//! # Responsibilities
//! - Give every inbound request an ID: the client's `x-request-id` if it sent
//!   one, otherwise a fresh UUID
//! - Keep a generated ID in request extensions only, so captured drops hold
//!   exactly the headers the client sent
//! - Echo the ID on the response
//! - Attach it to the request's trace span so every log line carries it

use axum::body::Body;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tower_http::request_id::{MakeRequestId, MakeRequestUuid, RequestId};
use tracing::Span;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Read the request ID assigned by `assign_request_id`.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for axum::http::Request<B> {
    fn request_id(&self) -> &str {
        self.extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Middleware: resolve the request ID, store it as an extension and echo it
/// on the response. The request's headers are left untouched.
pub async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = match request.headers().get(X_REQUEST_ID) {
        Some(value) => Some(RequestId::new(value.clone())),
        None => MakeRequestUuid.make_request_id(&request),
    };

    if let Some(id) = &id {
        request.extensions_mut().insert(id.clone());
    }

    let mut response = next.run(request).await;

    if let Some(id) = id {
        if !response.headers().contains_key(X_REQUEST_ID) {
            let value: HeaderValue = id.into_header_value();
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
    }

    response
}

/// Span for `TraceLayer`, carrying the request ID.
pub fn request_span(request: &axum::http::Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request.request_id(),
    )
}
