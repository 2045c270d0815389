//! # Identifiers
//!
//! Everything on the network is named by a tagged string: an optional
//! **sigil** saying what kind of thing it is, a base64 **body**, and a
//! **tag** after the final `.` naming the algorithm that produced it.
//!
//! ```text
//! @/02iw6SFEPIHl8nMkYSwcCgRWxiG6VP547Wcp1NW8Bo=.ed25519    feed (identity)
//! %lFluepOmDxEUcZWlLfz0rHU61xLQYxknAEd6z4un8P8=.sha256     message
//! &lFluepOmDxEUcZWlLfz0rHU61xLQYxknAEd6z4un8P8=.sha256     blob
//! lFluepOmDxEUcZWlLfz0rHU61xLQYxknAEd6z4un8P8=.sha256      bare
//! ```
//!
//! [`get_tag`] is the forgiving entry point used for dispatch: it never
//! fails. [`Identifier::from_str`] is the strict parser used when a record is
//! validated or normalized.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("identifier has no tag suffix")]
    MissingTag,
    #[error("identifier has an empty body")]
    EmptyBody,
    #[error("identifier has an empty tag")]
    EmptyTag,
    #[error("expected tag `{expected}`, found `{found}`")]
    TagMismatch { expected: String, found: String },
    #[error("invalid base64 in identifier body")]
    InvalidBase64,
}

/// The leading character of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sigil {
    /// `@`, a feed / identity public key
    Feed,
    /// `%`, a message reference
    Message,
    /// `&`, a binary blob reference
    Blob,
}

impl Sigil {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '@' => Some(Sigil::Feed),
            '%' => Some(Sigil::Message),
            '&' => Some(Sigil::Blob),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Sigil::Feed => '@',
            Sigil::Message => '%',
            Sigil::Blob => '&',
        }
    }
}

impl fmt::Display for Sigil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Return the tag of `identifier`: everything after the final `.`.
///
/// Returns `None` when there is no `.` at all. Malformed input never errors.
///
/// ```
/// use common::identifier::get_tag;
///
/// assert_eq!(get_tag("lFluepOmDxEUcZWlLfz0rHU61xLQYxknAEd6z4un8P8=.sha256"), Some("sha256"));
/// assert_eq!(get_tag("no-tag-here"), None);
/// ```
pub fn get_tag(identifier: &str) -> Option<&str> {
    identifier
        .rfind('.')
        .map(|index| &identifier[index + 1..])
}

/// Encode `bytes` as `base64.tag`.
pub fn encode_tagged(bytes: &[u8], tag: &str) -> String {
    format!("{}.{}", STANDARD.encode(bytes), tag)
}

/// Decode a `base64.tag` value, checking the tag.
///
/// Only the final `.` separates the tag, so a multi-part suffix such as
/// `sig.ed25519` is matched by passing `expected_tag = "sig.ed25519"`.
pub fn decode_tagged(value: &str, expected_tag: &str) -> Result<Vec<u8>, IdentifierError> {
    let suffix = format!(".{}", expected_tag);
    let body = match value.strip_suffix(&suffix) {
        Some(body) => body,
        None => {
            let found = get_tag(value).ok_or(IdentifierError::MissingTag)?;
            return Err(IdentifierError::TagMismatch {
                expected: expected_tag.to_string(),
                found: found.to_string(),
            });
        }
    };
    if body.is_empty() {
        return Err(IdentifierError::EmptyBody);
    }
    STANDARD
        .decode(body)
        .map_err(|_| IdentifierError::InvalidBase64)
}

/// A parsed identifier: `[sigil]body.tag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    sigil: Option<Sigil>,
    body: String,
    tag: String,
}

impl Identifier {
    pub fn new(sigil: Option<Sigil>, body: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            sigil,
            body: body.into(),
            tag: tag.into(),
        }
    }

    /// Build a feed identifier (`@body.tag`) from raw key bytes.
    pub fn feed(bytes: &[u8], tag: &str) -> Self {
        Self::new(Some(Sigil::Feed), STANDARD.encode(bytes), tag)
    }

    pub fn sigil(&self) -> Option<Sigil> {
        self.sigil
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The identifier without its sigil, `body.tag`.
    pub fn bare(&self) -> String {
        format!("{}.{}", self.body, self.tag)
    }

    /// Return a copy carrying `sigil`, replacing any existing one.
    pub fn with_sigil(mut self, sigil: Sigil) -> Self {
        self.sigil = Some(sigil);
        self
    }

    /// Decode the base64 body into bytes.
    pub fn decode_body(&self) -> Result<Vec<u8>, IdentifierError> {
        STANDARD
            .decode(&self.body)
            .map_err(|_| IdentifierError::InvalidBase64)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (sigil, rest) = match chars.next().and_then(Sigil::from_char) {
            Some(sigil) => (Some(sigil), chars.as_str()),
            None => (None, s),
        };

        let index = rest.rfind('.').ok_or(IdentifierError::MissingTag)?;
        let (body, tag) = (&rest[..index], &rest[index + 1..]);
        if body.is_empty() {
            return Err(IdentifierError::EmptyBody);
        }
        if tag.is_empty() {
            return Err(IdentifierError::EmptyTag);
        }

        Ok(Self::new(sigil, body, tag))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sigil) = self.sigil {
            write!(f, "{}", sigil)?;
        }
        write!(f, "{}.{}", self.body, self.tag)
    }
}
