//! Capture: write a live request as a stored HTTP/1.1 message.

use std::io;

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Version};
use bytes::Bytes;
use http_body_util::BodyExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{Framing, FramingError};

/// Error raised while capturing a request.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("failed to write drop: {0}")]
    Io(#[from] io::Error),

    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("request body was {actual} bytes but Content-Length declared {expected}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error(transparent)]
    Framing(#[from] FramingError),
}

/// Write `parts` and `body` to `out` as one HTTP/1.1 request message.
///
/// The body is copied frame by frame as it arrives. Returns the number of
/// body bytes captured (before chunk framing).
pub async fn serialize_request<W>(
    parts: &Parts,
    body: Body,
    out: &mut W,
) -> Result<u64, SerializeError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let framing = Framing::from_headers(&parts.headers)?;

    out.write_all(&encode_head(parts)).await?;
    let body_bytes = write_body(framing, body, out).await?;
    out.flush().await?;

    Ok(body_bytes)
}

/// Request line and header block, including the blank line.
pub(crate) fn encode_head(parts: &Parts) -> Vec<u8> {
    let mut head = Vec::with_capacity(512);

    let target = match parts.uri.path_and_query() {
        Some(pq) => pq.as_str(),
        None => parts.uri.authority().map_or("/", |a| a.as_str()),
    };
    let version = match parts.version {
        Version::HTTP_09 | Version::HTTP_10 => "HTTP/1.0",
        _ => "HTTP/1.1",
    };
    head.extend_from_slice(format!("{} {} {}\r\n", parts.method, target, version).as_bytes());

    // HTTP/2 carries the host in :authority
    if !parts.headers.contains_key(HOST) {
        if let Some(authority) = parts.uri.authority() {
            head.extend_from_slice(b"Host: ");
            head.extend_from_slice(authority.as_str().as_bytes());
            head.extend_from_slice(b"\r\n");
        }
    }

    encode_headers(&parts.headers, &mut head);
    head.extend_from_slice(b"\r\n");
    head
}

fn encode_headers(headers: &HeaderMap, out: &mut Vec<u8>) {
    for (name, value) in headers {
        out.extend_from_slice(canonical_name(name.as_str()).as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
}

/// `content-type` → `Content-Type`.
pub(crate) fn canonical_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c };
            upper = c == '-';
            out
        })
        .collect()
}

async fn write_body<W>(framing: Framing, mut body: Body, out: &mut W) -> Result<u64, SerializeError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written: u64 = 0;
    let mut trailers = None;

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(SerializeError::Body)?;
        let frame = match frame.into_data() {
            Ok(data) => {
                written += data.len() as u64;
                write_data(framing, &data, out).await?;
                continue;
            }
            Err(frame) => frame,
        };
        if let Ok(t) = frame.into_trailers() {
            trailers = Some(t);
        }
    }

    match framing {
        Framing::Chunked => {
            let mut tail = b"0\r\n".to_vec();
            if let Some(trailers) = &trailers {
                encode_headers(trailers, &mut tail);
            }
            tail.extend_from_slice(b"\r\n");
            out.write_all(&tail).await?;
        }
        Framing::Length(expected) if expected != written => {
            return Err(SerializeError::LengthMismatch {
                expected,
                actual: written,
            });
        }
        _ => {}
    }

    Ok(written)
}

async fn write_data<W>(framing: Framing, data: &Bytes, out: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if data.is_empty() {
        return Ok(());
    }

    match framing {
        Framing::Chunked => {
            out.write_all(format!("{:x}\r\n", data.len()).as_bytes()).await?;
            out.write_all(data).await?;
            out.write_all(b"\r\n").await
        }
        Framing::Length(_) | Framing::UntilEof => out.write_all(data).await,
    }
}
