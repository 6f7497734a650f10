//! The stored drop format: one HTTP/1.1 request message per drop.
//!
//! # Data Flow
//! ```text
//! Capture:
//!     live request (axum parts + body frames)
//!     → serialize.rs (request line, headers, re-framed body)
//!     → DropSink
//!
//! Replay:
//!     DropReader
//!     → parse.rs (request line, header block, lazy body decoder)
//!     → Request<BodyStream>
//! ```
//!
//! Both halves share `Framing`, so whatever body framing the writer chose from
//! the captured headers is exactly what the reader decodes.
//!
//! # Format (version 1)
//! ```text
//! <METHOD> <path-and-query> HTTP/1.x\r\n
//! [Host: <authority>\r\n]            only when the request had no Host header
//! <Header-Name>: <value>\r\n         received order, duplicates kept
//! \r\n
//! <body>                             chunked | Content-Length bytes | to EOF
//! ```

pub mod media_type;
pub mod parse;
pub mod serialize;

use axum::http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use axum::http::HeaderMap;

pub use parse::{parse_request, BodyDecoder, BodyStream, ParseError};
pub use serialize::{serialize_request, SerializeError};

/// Name of the stored message format.
pub const WIRE_FORMAT: &str = "http/1.1-request-message";

/// Version of the stored message format.
pub const WIRE_FORMAT_VERSION: u32 = 1;

/// How a message body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// `Content-Length: n`.
    Length(u64),
    /// Everything up to the end of the stored object.
    UntilEof,
}

/// Headers that make body framing ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    #[error("invalid Content-Length {0:?}")]
    InvalidContentLength(String),

    #[error("conflicting Content-Length values")]
    ConflictingContentLength,

    #[error("unsupported Transfer-Encoding {0:?}")]
    UnsupportedTransferEncoding(String),
}

impl Framing {
    /// Determine framing from message headers.
    ///
    /// `Transfer-Encoding` wins over `Content-Length`; its final coding must
    /// be `chunked`.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, FramingError> {
        let codings: Vec<String> = headers
            .get_all(TRANSFER_ENCODING)
            .iter()
            .flat_map(|v| {
                String::from_utf8_lossy(v.as_bytes())
                    .split(',')
                    .map(|c| c.trim().to_ascii_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect();

        if let Some(last) = codings.last() {
            return if last == "chunked" {
                Ok(Framing::Chunked)
            } else {
                Err(FramingError::UnsupportedTransferEncoding(codings.join(", ")))
            };
        }

        let mut length = None;
        for value in headers.get_all(CONTENT_LENGTH) {
            for part in String::from_utf8_lossy(value.as_bytes()).split(',') {
                let part = part.trim();
                let parsed: u64 = part
                    .parse()
                    .map_err(|_| FramingError::InvalidContentLength(part.to_string()))?;
                match length {
                    Some(existing) if existing != parsed => {
                        return Err(FramingError::ConflictingContentLength)
                    }
                    _ => length = Some(parsed),
                }
            }
        }

        Ok(length.map_or(Framing::UntilEof, Framing::Length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_chunked_wins_over_length() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("gzip, Chunked"));
        assert_eq!(Framing::from_headers(&headers), Ok(Framing::Chunked));
    }

    #[test]
    fn test_content_length() {
        let mut headers = HeaderMap::new();
        headers.append(CONTENT_LENGTH, HeaderValue::from_static("42"));
        headers.append(CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(Framing::from_headers(&headers), Ok(Framing::Length(42)));

        headers.append(CONTENT_LENGTH, HeaderValue::from_static("43"));
        assert_eq!(
            Framing::from_headers(&headers),
            Err(FramingError::ConflictingContentLength)
        );
    }

    #[test]
    fn test_no_framing_headers_reads_to_eof() {
        assert_eq!(Framing::from_headers(&HeaderMap::new()), Ok(Framing::UntilEof));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("-1"));
        assert!(matches!(
            Framing::from_headers(&headers),
            Err(FramingError::InvalidContentLength(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("gzip"));
        assert!(matches!(
            Framing::from_headers(&headers),
            Err(FramingError::UnsupportedTransferEncoding(_))
        ));
    }
}
