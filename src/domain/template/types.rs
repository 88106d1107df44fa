//! Template types and error definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::merge::MergeError;
use crate::domain::merge_tag::{ExtractionError, MergeTagError};

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid culture code: {0}")]
    InvalidCulture(String),

    #[error("Merge tag already declared: {0}")]
    DuplicateMergeTag(String),

    #[error("Default content for '{0}' cannot be removed while other cultures exist")]
    DefaultContentRequired(String),

    #[error("Merge tag validation failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    MergeTag(#[from] MergeTagError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Caller input for adding or replacing a culture's body content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyContentDraft {
    /// Culture code such as `en-US`
    pub culture_code: String,

    /// Subject line, may contain `{{identifier}}` placeholders
    pub subject: String,

    /// Template source compiled at render time
    pub body: String,

    /// Structured (JSON) editor source used for merge tag extraction
    pub json_structure: String,

    /// Request this content to become the template's default
    #[serde(default)]
    pub is_default: bool,
}

impl BodyContentDraft {
    pub fn new(
        culture_code: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        json_structure: impl Into<String>,
    ) -> Self {
        Self {
            culture_code: culture_code.into(),
            subject: subject.into(),
            body: body.into(),
            json_structure: json_structure.into(),
            is_default: false,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Check the fields that do not depend on the template type
    pub fn validate(&self) -> TemplateResult<()> {
        validate_culture_code(&self.culture_code)?;

        if self.subject.trim().is_empty() || self.subject.chars().count() > 998 {
            return Err(TemplateError::InvalidTemplate(
                "Subject must be 1-998 characters".to_string(),
            ));
        }

        if self.body.trim().is_empty() {
            return Err(TemplateError::InvalidTemplate(
                "Body must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validate a BCP 47 style culture code (`it`, `en-US`, `zh-Hant-TW`)
pub fn validate_culture_code(code: &str) -> TemplateResult<()> {
    let invalid = || TemplateError::InvalidCulture(code.to_string());

    if code.len() < 2 || code.len() > 35 {
        return Err(invalid());
    }

    let mut subtags = code.split('-');
    let language = subtags.next().unwrap_or_default();
    if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    for subtag in subtags {
        if subtag.is_empty() || subtag.len() > 8 || !subtag.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(invalid());
        }
    }

    Ok(())
}

/// Validate a template or template type name
pub(crate) fn validate_name(name: &str) -> TemplateResult<()> {
    if name.trim().is_empty() || name.len() > 256 {
        return Err(TemplateError::InvalidTemplate(
            "Name must be 1-256 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_culture_codes() {
        for code in ["en", "en-US", "it-IT", "zh-Hant-TW", "es-419"] {
            assert!(validate_culture_code(code).is_ok(), "{code} should be valid");
        }
        for code in ["", "e", "en_US", "en-", "1n-US", "en-TOOLONGSUB", "en US"] {
            assert!(
                matches!(validate_culture_code(code), Err(TemplateError::InvalidCulture(_))),
                "{code:?} should be invalid"
            );
        }
    }

    #[test]
    fn test_draft_validation() {
        let draft = BodyContentDraft::new("en-US", "Hello", "<p>Hi</p>", "{}");
        assert!(draft.validate().is_ok());

        let draft = BodyContentDraft::new("en-US", " ", "<p>Hi</p>", "{}");
        assert!(matches!(
            draft.validate(),
            Err(TemplateError::InvalidTemplate(_))
        ));

        let draft = BodyContentDraft::new("en-US", "Hello", "", "{}");
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_subject_limit_counts_characters() {
        let draft = BodyContentDraft::new("it-IT", "é".repeat(998), "<p>Ciao</p>", "{}");
        assert!(draft.validate().is_ok());

        let draft = BodyContentDraft::new("it-IT", "é".repeat(999), "<p>Ciao</p>", "{}");
        assert!(matches!(
            draft.validate(),
            Err(TemplateError::InvalidTemplate(_))
        ));
    }
}
