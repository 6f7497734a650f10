//! Download filename derivation for replayed drops.
//!
//! Precedence:
//! 1. `filename` parameter of the captured `Content-Disposition`
//! 2. `<id>.<ext>` where `ext` is the first extension registered for the
//!    captured `Content-Type`
//! 3. `<id>.data`

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::drop::DropId;
use crate::wire::media_type::{is_token_char, MediaType};

/// Extension used when the content type has no registered extension.
pub const FALLBACK_EXTENSION: &str = "data";

/// RFC 5987 `attr-char` minus alphanumerics.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Where a download name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    Disposition,
    ContentType,
    Fallback,
}

/// The filename a replayed drop is served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadName {
    filename: String,
    source: NameSource,
}

impl DownloadName {
    /// Derive the download name from the captured request headers.
    ///
    /// A malformed `Content-Disposition` is logged and skipped.
    pub fn derive(id: &DropId, headers: &HeaderMap) -> Self {
        if let Some(filename) = disposition_filename(id, headers) {
            return Self {
                filename,
                source: NameSource::Disposition,
            };
        }

        match headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(extension_for)
        {
            Some(ext) => Self {
                filename: format!("{}.{}", id, ext),
                source: NameSource::ContentType,
            },
            None => Self {
                filename: format!("{}.{}", id, FALLBACK_EXTENSION),
                source: NameSource::Fallback,
            },
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn source(&self) -> NameSource {
        self.source
    }

    /// Render `attachment; filename=<name>` for the outbound response.
    ///
    /// Token-safe names are written bare, other ASCII names quoted, and
    /// non-ASCII names get an RFC 5987 `filename*` next to an ASCII fallback.
    pub fn content_disposition(&self) -> HeaderValue {
        let name: String = self.filename.chars().filter(|c| !c.is_control()).collect();

        let rendered = if !name.is_empty() && name.chars().all(is_token_char) {
            format!("attachment; filename={}", name)
        } else if name.is_ascii() {
            format!("attachment; filename={}", quote(&name))
        } else {
            let ascii: String = name
                .chars()
                .map(|c| if c.is_ascii() { c } else { '_' })
                .collect();
            format!(
                "attachment; filename={}; filename*=UTF-8''{}",
                quote(&ascii),
                utf8_percent_encode(&name, ATTR_CHAR)
            )
        };

        HeaderValue::from_str(&rendered)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn disposition_filename(id: &DropId, headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_DISPOSITION)?;

    let parsed = raw
        .to_str()
        .map_err(|e| e.to_string())
        .and_then(|value| MediaType::parse(value).map_err(|e| e.to_string()));

    match parsed {
        Ok(disposition) => {
            tracing::debug!(
                drop_id = %id,
                disposition = disposition.essence(),
                "Parsed captured Content-Disposition"
            );
            disposition
                .param("filename")
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        }
        Err(error) => {
            tracing::warn!(
                drop_id = %id,
                content_disposition = ?raw,
                error = %error,
                "Ignoring malformed Content-Disposition"
            );
            None
        }
    }
}

/// Conventional extensions for types whose registered list does not start
/// with the usual one (`mime_guess` orders extensions alphabetically).
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("image/jpeg", "jpg"),
    ("image/tiff", "tiff"),
    ("audio/mpeg", "mp3"),
    ("video/mpeg", "mpeg"),
    ("application/javascript", "js"),
    ("text/javascript", "js"),
];

/// File extension for a content type, parameters ignored: the conventional
/// one where known, else the first one registered.
///
/// `application/octet-stream` names no particular format and has none.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let media_type = MediaType::parse(content_type).ok()?;
    if media_type.essence() == "application/octet-stream" {
        return None;
    }

    if let Some((_, ext)) = PREFERRED_EXTENSIONS
        .iter()
        .find(|(essence, _)| *essence == media_type.essence())
    {
        return Some(ext);
    }

    mime_guess::get_mime_extensions_str(media_type.essence())
        .and_then(|exts| exts.first())
        .copied()
}
