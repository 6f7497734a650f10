//! Opaque drop identifiers.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Longest identifier accepted on lookup.
const MAX_ID_LEN: usize = 64;

/// Identifier of a single drop.
///
/// Generated IDs are UUIDv7 values rendered as 32 lowercase hex digits, so they
/// sort by creation time and need no coordination between concurrent callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DropId(String);

/// A lookup key that cannot name a stored drop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid drop id: {0:?}")]
pub struct InvalidDropId(pub String);

impl DropId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    /// Validate an identifier exactly as given.
    pub fn parse(raw: &str) -> Result<Self, InvalidDropId> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidDropId(raw.to_string()))
        }
    }

    /// Resolve a URL path segment to a drop identifier.
    ///
    /// Everything from the first `.` onward is an extension hint and is
    /// dropped, so `<id>.pdf` and `<id>` name the same drop.
    pub fn from_path_segment(segment: &str) -> Result<Self, InvalidDropId> {
        let key = segment.split('.').next().unwrap_or_default();
        Self::parse(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DropId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
