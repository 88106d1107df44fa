//! Domain layer modules
//!
//! This module contains business domain logic:
//! - `merge_tag`: Merge tag declarations, short codes, typed values and extraction
//! - `merge`: Render-time merge, linked resources and substitution
//! - `template`: Template type, email template and data owner aggregates

pub mod merge;
pub mod merge_tag;
pub mod template;
