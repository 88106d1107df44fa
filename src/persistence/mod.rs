//! Persistence of template aggregates.
//!
//! This module provides:
//! - Storage records with deflate-compressed template sources
//! - The [`TemplateRepository`] trait and an in-memory implementation

mod record;
mod repository;

use thiserror::Error;

use crate::domain::merge_tag::MergeTagError;

pub use record::{
    compress, decompress, BodyContentRecord, EmailTemplateRecord, MergeTagRecord,
    TemplateTypeRecord,
};
pub use repository::{create_repository, InMemoryTemplateRepository, TemplateRepository};

/// Errors raised while loading or saving aggregates
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown merge tag type: {0}")]
    UnknownTagType(String),

    #[error("Invalid stored merge tag: {0}")]
    InvalidTag(#[from] MergeTagError),

    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Stored text is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;
