//! Merge tag subsystem.
//!
//! This module provides:
//! - The `{{identifier}}` short code grammar ([`ShortCode`])
//! - Typed merge tag declarations ([`MergeTag`]) and valued tags ([`CustomMergeTag`])
//! - Ordered, culture-invariant string parsing ([`parse`], [`parse_first`])
//! - Extraction of referenced tags from a template's JSON structure
//!
//! # Example
//!
//! ```ignore
//! let accepted = vec![
//!     MergeTag::new("name", TagType::String)?,
//!     MergeTag::new("photo", TagType::Image)?,
//! ];
//!
//! let structure = r#"{"rows":[{"text":"Hi {{name}}"}]}"#;
//! let used = extract_merge_tags(structure, &accepted)?;
//! assert_eq!(used.len(), 1);
//! ```

mod extraction;
mod short_code;
mod types;
mod value;

use thiserror::Error;

pub use extraction::{
    extract_merge_tags, find_short_codes, referenced_identifiers, scan_short_codes,
    ExtractionError,
};
pub use short_code::{is_identifier_char, validate, ShortCode, BEGIN_MARKER, END_MARKER};
pub use types::{CustomMergeTag, MergeTag, NonEmptyString};
pub use value::{parse, parse_first, parse_json_value, ParseError, TagType, TagValue};

/// Errors raised while building merge tags
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeTagError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("Malformed short code '{value}': {reason}")]
    MalformedShortCode { value: String, reason: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Result type for merge tag operations
pub type MergeTagResult<T> = Result<T, MergeTagError>;
