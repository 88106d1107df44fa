//! Email template aggregates.
//!
//! This module provides:
//! - Template types holding the accepted merge tag vocabulary
//! - Email templates with one body content per culture and a single default
//! - Data owners carrying custom merge data
//!
//! # Example
//!
//! ```ignore
//! let mut welcome = TemplateType::with_merge_tags(
//!     "Welcome",
//!     [MergeTag::new("name", TagType::String)?],
//! )?;
//!
//! let template_id = welcome
//!     .add_template(
//!         "Welcome mail",
//!         BodyContentDraft::new("en-US", "Hi {{name}}", "<p>Hi {{name}}</p>", json),
//!     )?
//!     .id();
//!
//! let content = welcome.template(template_id)?.content("en-US")?;
//! let email = content.render(&MergeEngine::default(), &request, &[])?;
//! ```

mod aggregate;
mod content;
mod owner;
mod types;

pub use aggregate::{EmailTemplate, TemplateType};
pub use content::{recompute_merge_tags, EmailBodyContent};
pub use owner::DataOwner;
pub use types::{validate_culture_code, BodyContentDraft, TemplateError, TemplateResult};
