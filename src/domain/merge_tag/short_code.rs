//! Short code grammar: `{{identifier}}` where the identifier is one or more
//! of `[A-Za-z0-9_.]`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::MergeTagError;

/// Opening marker of a short code
pub const BEGIN_MARKER: &str = "{{";

/// Closing marker of a short code
pub const END_MARKER: &str = "}}";

/// A validated `{{identifier}}` placeholder
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortCode(String);

impl ShortCode {
    /// Validate and wrap an existing short code
    pub fn new(value: impl Into<String>) -> Result<Self, MergeTagError> {
        let value = value.into();
        validate(&value)?;
        Ok(Self(value))
    }

    /// Build the canonical short code for a merge tag name.
    ///
    /// The name is trimmed, whitespace runs become `_`, the result is
    /// lower-cased and characters outside the grammar are dropped.
    pub fn generate(name: &str) -> Result<Self, MergeTagError> {
        let identifier: String = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase()
            .chars()
            .filter(|c| is_identifier_char(*c))
            .collect();

        if identifier.is_empty() {
            return Err(MergeTagError::Empty("merge tag name"));
        }

        Self::new(format!("{BEGIN_MARKER}{identifier}{END_MARKER}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier with both markers stripped
    pub fn identifier(&self) -> &str {
        &self.0[BEGIN_MARKER.len()..self.0.len() - END_MARKER.len()]
    }
}

/// Characters allowed between the markers
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Check a candidate string against the short code grammar
pub fn validate(value: &str) -> Result<(), MergeTagError> {
    let malformed = |reason: String| MergeTagError::MalformedShortCode {
        value: value.to_string(),
        reason,
    };

    if value.find(BEGIN_MARKER) != Some(0) {
        return Err(malformed(format!("must start with '{BEGIN_MARKER}'")));
    }

    let end = value.len().saturating_sub(END_MARKER.len());
    match value.rfind(END_MARKER) {
        Some(idx) if idx == end && idx >= BEGIN_MARKER.len() => {}
        _ => return Err(malformed(format!("must end with '{END_MARKER}'"))),
    }

    let body = &value[BEGIN_MARKER.len()..end];
    if body.is_empty() {
        return Err(malformed("identifier is empty".to_string()));
    }

    if let Some(c) = body.chars().find(|c| !is_identifier_char(*c)) {
        return Err(malformed(format!("invalid character '{c}'")));
    }

    Ok(())
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ShortCode {
    type Error = MergeTagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShortCode> for String {
    fn from(code: ShortCode) -> Self {
        code.0
    }
}
