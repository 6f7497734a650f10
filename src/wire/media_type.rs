//! MIME media type values with parameters.
//!
//! Parses header values shaped like `type/subtype; key=value` (Content-Type)
//! or `disposition; key="value"` (Content-Disposition).
//!
//! # Design Decisions
//! - Type and parameter names are case-insensitive and stored lowercased
//! - Parameter values are tokens or quoted strings with `\` escapes
//! - RFC 2231/5987 extended values (`filename*=UTF-8''a%20b.pdf`) are decoded
//!   and replace the plain parameter of the same name
//! - A duplicate parameter is an error, a dangling trailing `;` is not

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

/// Error raised when a header value is not a well-formed media type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaTypeError {
    #[error("empty media type")]
    Empty,

    #[error("invalid media type {0:?}")]
    InvalidType(String),

    #[error("invalid media parameter near {0:?}")]
    InvalidParameter(String),

    #[error("duplicate media parameter {0:?}")]
    DuplicateParameter(String),
}

/// A parsed media type: lowercased essence plus parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    essence: String,
    params: BTreeMap<String, String>,
}

impl MediaType {
    pub fn parse(value: &str) -> Result<Self, MediaTypeError> {
        let (head, mut rest) = match value.find(';') {
            Some(i) => (&value[..i], &value[i..]),
            None => (value, ""),
        };

        let essence = head.trim().to_ascii_lowercase();
        check_type(&essence)?;

        let mut params = BTreeMap::new();
        let mut extended = BTreeMap::new();

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }

            let Some((key, value, remaining)) = consume_param(rest) else {
                // `text/plain;` and `attachment; ` are tolerated
                if rest.trim() == ";" {
                    break;
                }
                return Err(MediaTypeError::InvalidParameter(rest.to_string()));
            };
            rest = remaining;

            if let Some(base) = key.strip_suffix('*') {
                if extended.contains_key(base) {
                    return Err(MediaTypeError::DuplicateParameter(key));
                }
                if let Some(decoded) = decode_extended_value(&value) {
                    extended.insert(base.to_string(), decoded);
                }
                continue;
            }

            if params.contains_key(&key) {
                return Err(MediaTypeError::DuplicateParameter(key));
            }
            params.insert(key, value);
        }

        params.extend(extended);

        Ok(Self { essence, params })
    }

    /// Lowercased type without parameters, e.g. `application/pdf` or `attachment`.
    pub fn essence(&self) -> &str {
        &self.essence
    }

    /// Look up a parameter by (case-insensitive) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// RFC 7230 `tchar`.
pub(crate) fn is_token_char(c: char) -> bool {
    c.is_ascii() && c > ' ' && c != '\x7f' && !"()<>@,;:\\\"/[]?=".contains(c)
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

/// Accepts `token` (dispositions) or `token/token` (media types).
fn check_type(essence: &str) -> Result<(), MediaTypeError> {
    if essence.is_empty() {
        return Err(MediaTypeError::Empty);
    }

    let valid = match essence.split_once('/') {
        Some((major, minor)) => is_token(major) && is_token(minor),
        None => is_token(essence),
    };

    if valid {
        Ok(())
    } else {
        Err(MediaTypeError::InvalidType(essence.to_string()))
    }
}

/// Consume `; key=value` from the front of `input`.
fn consume_param(input: &str) -> Option<(String, String, &str)> {
    let rest = input.strip_prefix(';')?.trim_start();

    let key_len = rest
        .find(|c: char| !is_token_char(c))
        .unwrap_or(rest.len());
    if key_len == 0 {
        return None;
    }
    let key = rest[..key_len].to_ascii_lowercase();

    let rest = rest[key_len..].trim_start().strip_prefix('=')?.trim_start();
    let (value, rest) = consume_value(rest)?;

    Some((key, value, rest))
}

fn consume_value(input: &str) -> Option<(String, &str)> {
    let Some(quoted) = input.strip_prefix('"') else {
        let len = input
            .find(|c: char| !is_token_char(c))
            .unwrap_or(input.len());
        if len == 0 {
            return None;
        }
        return Some((input[..len].to_string(), &input[len..]));
    };

    let mut value = String::new();
    let mut chars = quoted.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, &quoted[i + 1..])),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(escaped);
            }
            '\r' | '\n' => return None,
            _ => value.push(c),
        }
    }

    // unterminated
    None
}

/// Decode `charset'language'percent-encoded` extended values.
fn decode_extended_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?.to_ascii_lowercase();
    let _language = parts.next()?;
    let encoded = parts.next()?;

    match charset.as_str() {
        "utf-8" | "us-ascii" => percent_decode_str(encoded)
            .decode_utf8()
            .ok()
            .map(|s| s.into_owned()),
        _ => None,
    }
}
