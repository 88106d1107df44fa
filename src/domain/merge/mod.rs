//! Render-time merge and substitution.
//!
//! This module provides:
//! - Separation of image-valued merge data into inline linked resources
//! - The substitution engine seam ([`TemplateEngine`] / [`CompiledTemplate`])
//! - The built-in `{{identifier}}` placeholder engine
//! - Plain-text fallback generation for the rendered HTML

mod engine;
mod resource;
mod substitution;
mod text;

use thiserror::Error;

pub use engine::{
    merge, prepare_merge, MergeEngine, MergeOptions, PreparedMerge, RenderRequest, RenderedEmail,
    DEFAULT_MAX_INLINE_BYTES,
};
pub use resource::{
    detect_media_type, LinkedResource, ResourceDescriptor, ResourceEncoding, ResourcePayload,
    OCTET_STREAM,
};
pub use substitution::{CompiledTemplate, PlaceholderEngine, PlaceholderTemplate, TemplateEngine};
pub use text::{escape_html, to_plain_text};

/// Errors raised while merging data into a template
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Image value for '{name}' is not valid base64: {source}")]
    InvalidImage {
        name: String,
        source: base64::DecodeError,
    },

    #[error("Image value for '{name}' is empty")]
    EmptyResource { name: String },

    #[error("Resource '{name}' is {size} bytes, above the {limit} byte inline limit")]
    ResourceTooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    #[error("Template compilation failed: {0}")]
    Compile(String),
}

/// Result type for merge operations
pub type MergeResult<T> = Result<T, MergeError>;
