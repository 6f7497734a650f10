//! Replay: parse a stored drop back into an HTTP request.
//!
//! The head is parsed eagerly under fixed limits; the body is exposed as a
//! stream that pulls at most `BODY_CHUNK_SIZE` bytes from storage per item.

use std::io;

use axum::http::{HeaderName, HeaderValue, Method, Request, Uri, Version};
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use super::{Framing, FramingError};

/// Longest request line, header line or chunk-size line.
pub const MAX_LINE_LEN: usize = 16 * 1024;

/// Largest request line + header block.
pub const MAX_HEAD_LEN: usize = 64 * 1024;

/// Most header lines in one message.
pub const MAX_HEADERS: usize = 256;

/// Largest body chunk handed to the response.
pub const BODY_CHUNK_SIZE: usize = 64 * 1024;

/// Replayed body: lazily decoded chunks of the stored message.
pub type BodyStream = BoxStream<'static, io::Result<Bytes>>;

/// Error raised when stored bytes are not a well-formed request message.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("stored request is truncated")]
    UnexpectedEof,

    #[error("line exceeds {} bytes", MAX_LINE_LEN)]
    LineTooLong,

    #[error("request head exceeds {} bytes", MAX_HEAD_LEN)]
    HeadTooLarge,

    #[error("more than {} header lines", MAX_HEADERS)]
    TooManyHeaders,

    #[error("malformed request line {0:?}")]
    RequestLine(String),

    #[error("unsupported HTTP version {0:?}")]
    Version(String),

    #[error("malformed header line {0:?}")]
    Header(String),

    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error("failed to read stored request: {0}")]
    Io(#[from] io::Error),
}

/// Parse a stored request message from `reader`.
///
/// Returns once the header block has been read; the body is decoded as the
/// returned stream is polled.
pub async fn parse_request<R>(reader: R) -> Result<Request<BodyStream>, ParseError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::with_capacity(BODY_CHUNK_SIZE, reader);
    let mut budget = MAX_HEAD_LEN;

    let line = read_head_line(&mut reader, &mut budget).await?;
    let (method, uri, version) = parse_request_line(&line)?;

    let mut builder = Request::builder().method(method).uri(uri).version(version);
    let mut count = 0;
    loop {
        let line = read_head_line(&mut reader, &mut budget).await?;
        if line.is_empty() {
            break;
        }

        count += 1;
        if count > MAX_HEADERS {
            return Err(ParseError::TooManyHeaders);
        }

        let (name, value) = parse_header_line(&line)?;
        builder = builder.header(name, value);
    }

    let framing = match builder.headers_ref() {
        Some(headers) => Framing::from_headers(headers)?,
        None => Framing::UntilEof,
    };

    let decoder = BodyDecoder::new(reader, framing);
    builder
        .body(decoder.into_stream())
        .map_err(|e| ParseError::RequestLine(e.to_string()))
}

/// Read one line of the head, without its line terminator.
async fn read_head_line<R>(reader: &mut R, budget: &mut usize) -> Result<Vec<u8>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_LINE_LEN.min(*budget);
    let line = read_line(reader, limit).await.map_err(|e| match e {
        ParseError::LineTooLong if limit < MAX_LINE_LEN => ParseError::HeadTooLarge,
        other => other,
    })?;
    *budget -= line.consumed;
    Ok(line.content)
}

struct Line {
    content: Vec<u8>,
    consumed: usize,
}

/// Read up to and including `\n`, accepting bare LF as well as CRLF.
async fn read_line<R>(reader: &mut R, limit: usize) -> Result<Line, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let consumed = (&mut *reader).take(limit as u64).read_until(b'\n', &mut buf).await?;

    if buf.last() != Some(&b'\n') {
        return Err(if consumed == limit {
            ParseError::LineTooLong
        } else {
            ParseError::UnexpectedEof
        });
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    Ok(Line {
        content: buf,
        consumed,
    })
}

fn parse_request_line(line: &[u8]) -> Result<(Method, Uri, Version), ParseError> {
    let malformed = || ParseError::RequestLine(String::from_utf8_lossy(line).into_owned());

    let mut parts = line.split(|&b| b == b' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };

    let method = Method::from_bytes(method).map_err(|_| malformed())?;
    let uri = Uri::try_from(target).map_err(|_| malformed())?;
    let version = match version {
        b"HTTP/1.1" => Version::HTTP_11,
        b"HTTP/1.0" => Version::HTTP_10,
        other => return Err(ParseError::Version(String::from_utf8_lossy(other).into_owned())),
    };

    Ok((method, uri, version))
}

fn parse_header_line(line: &[u8]) -> Result<(HeaderName, HeaderValue), ParseError> {
    let malformed = || ParseError::Header(String::from_utf8_lossy(line).into_owned());

    // obsolete line folding is not accepted in requests
    if matches!(line.first(), Some(b' ' | b'\t')) {
        return Err(malformed());
    }

    let colon = line.iter().position(|&b| b == b':').ok_or_else(malformed)?;
    let name = HeaderName::from_bytes(&line[..colon]).map_err(|_| malformed())?;
    let value = HeaderValue::from_bytes(line[colon + 1..].trim_ascii()).map_err(|_| malformed())?;

    Ok((name, value))
}

/// Incremental decoder for the body of a stored message.
pub struct BodyDecoder<R> {
    reader: R,
    framing: Framing,
    state: DecodeState,
}

#[derive(Debug, Clone, Copy)]
enum DecodeState {
    /// Bytes left in the current length-delimited region.
    Remaining(u64),
    /// Between chunks; the next line is a chunk size.
    ChunkHeader,
    Done,
}

impl<R> BodyDecoder<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, framing: Framing) -> Self {
        let state = match framing {
            Framing::Length(0) => DecodeState::Done,
            Framing::Length(n) => DecodeState::Remaining(n),
            Framing::Chunked => DecodeState::ChunkHeader,
            Framing::UntilEof => DecodeState::Remaining(u64::MAX),
        };
        Self {
            reader,
            framing,
            state,
        }
    }

    /// Next piece of body data, or `None` once the body is complete.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            match self.state {
                DecodeState::Done => return Ok(None),
                DecodeState::ChunkHeader => {
                    let size = self.read_chunk_size().await?;
                    if size == 0 {
                        self.skip_trailers().await?;
                        self.state = DecodeState::Done;
                    } else {
                        self.state = DecodeState::Remaining(size);
                    }
                }
                DecodeState::Remaining(remaining) => {
                    let want = remaining.min(BODY_CHUNK_SIZE as u64);
                    let mut buf = BytesMut::with_capacity(want as usize);
                    let n = (&mut self.reader).take(want).read_buf(&mut buf).await?;

                    if n == 0 {
                        if self.framing == Framing::UntilEof {
                            self.state = DecodeState::Done;
                            return Ok(None);
                        }
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "stored body is shorter than its framing declares",
                        ));
                    }

                    let left = remaining - n as u64;
                    self.state = match (left, self.framing) {
                        (0, Framing::Chunked) => {
                            self.expect_crlf().await?;
                            DecodeState::ChunkHeader
                        }
                        (0, _) => DecodeState::Done,
                        (left, Framing::UntilEof) => DecodeState::Remaining(left.max(1)),
                        (left, _) => DecodeState::Remaining(left),
                    };

                    return Ok(Some(buf.freeze()));
                }
            }
        }
    }

    pub fn into_stream(self) -> BodyStream {
        stream::try_unfold(self, |mut decoder| async move {
            Ok::<_, io::Error>(decoder.next_chunk().await?.map(|chunk| (chunk, decoder)))
        })
        .boxed()
    }

    async fn read_chunk_size(&mut self) -> io::Result<u64> {
        let line = self.read_body_line().await?;
        let size = line.split(|&b| b == b';').next().unwrap_or_default();
        let size = std::str::from_utf8(size.trim_ascii())
            .ok()
            .and_then(|s| u64::from_str_radix(s, 16).ok())
            .ok_or_else(|| invalid_data("malformed chunk size"))?;
        Ok(size)
    }

    async fn expect_crlf(&mut self) -> io::Result<()> {
        if self.read_body_line().await?.is_empty() {
            Ok(())
        } else {
            Err(invalid_data("missing CRLF after chunk data"))
        }
    }

    async fn skip_trailers(&mut self) -> io::Result<()> {
        for _ in 0..=MAX_HEADERS {
            if self.read_body_line().await?.is_empty() {
                return Ok(());
            }
        }
        Err(invalid_data("too many trailer lines"))
    }

    async fn read_body_line(&mut self) -> io::Result<Vec<u8>> {
        match read_line(&mut self.reader, MAX_LINE_LEN).await {
            Ok(line) => Ok(line.content),
            Err(ParseError::Io(e)) => Err(e),
            Err(ParseError::UnexpectedEof) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stored chunked body is truncated",
            )),
            Err(e) => Err(invalid_data(e.to_string())),
        }
    }
}

fn invalid_data(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}
