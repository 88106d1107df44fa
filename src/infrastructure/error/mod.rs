//! Unified error type for the crate

use thiserror::Error;

use crate::domain::template::TemplateError;
use crate::persistence::PersistenceError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl AppError {
    /// Stable machine readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Template(e) => match e {
                TemplateError::NotFound(_) => "NOT_FOUND",
                TemplateError::AlreadyExists(_) | TemplateError::DuplicateMergeTag(_) => {
                    "CONFLICT"
                }
                TemplateError::InvalidTemplate(_) | TemplateError::InvalidCulture(_) => {
                    "VALIDATION_ERROR"
                }
                TemplateError::DefaultContentRequired(_) => "DEFAULT_CONTENT_REQUIRED",
                TemplateError::Extraction(_) => "EXTRACTION_ERROR",
                TemplateError::MergeTag(_) => "INVALID_MERGE_TAG",
                TemplateError::Merge(_) => "MERGE_ERROR",
            },
            AppError::Persistence(e) => match e {
                PersistenceError::NotFound(_) => "NOT_FOUND",
                _ => "STORAGE_ERROR",
            },
        }
    }

    /// Whether the error means the addressed entity does not exist
    pub fn is_not_found(&self) -> bool {
        self.code() == "NOT_FOUND"
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::from(TemplateError::NotFound("content".into()));
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.is_not_found());

        let err = AppError::from(PersistenceError::UnknownTagType("Integer".into()));
        assert_eq!(err.code(), "STORAGE_ERROR");

        let err = AppError::from(TemplateError::DuplicateMergeTag("name".into()));
        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(err.to_string(), "Merge tag already declared: name");

        let err = AppError::Validation("subject too long".into());
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(!err.is_not_found());
    }
}
