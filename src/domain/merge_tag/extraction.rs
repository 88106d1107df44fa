//! Extraction of referenced merge tags from a template's JSON structure.
//!
//! Scanning and grammar validation are separate steps: the scan collects
//! every `{{...}}` candidate on a line, then each candidate is validated as a
//! [`ShortCode`]. A candidate that fails the grammar rejects the whole
//! document.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::short_code::ShortCode;
use super::types::MergeTag;
use super::MergeTagError;

lazy_static! {
    /// Lazy match so a candidate never spans a closing marker; placeholders
    /// never span lines.
    static ref SHORT_CODE_SCAN: Regex = Regex::new(r"(?m)\{\{.*?\}\}").unwrap();
}

/// Errors raised while reconciling a template with its accepted tags
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Template structure is not valid JSON: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    #[error("Template references an invalid short code: {0}")]
    InvalidShortCode(#[from] MergeTagError),
}

/// Every short code candidate in `raw` with its position
pub fn find_short_codes(raw: &str) -> regex::Matches<'static, '_> {
    let scan: &'static Regex = &SHORT_CODE_SCAN;
    scan.find_iter(raw)
}

/// Every short code candidate in `raw`, in order, duplicates included
pub fn scan_short_codes(raw: &str) -> impl Iterator<Item = &str> {
    find_short_codes(raw).map(|m| m.as_str())
}

/// Distinct identifiers referenced in `raw`
pub fn referenced_identifiers(raw: &str) -> Result<BTreeSet<String>, ExtractionError> {
    scan_short_codes(raw)
        .map(|candidate| {
            ShortCode::new(candidate)
                .map(|code| code.identifier().to_string())
                .map_err(ExtractionError::from)
        })
        .collect()
}

/// Reconcile the tags referenced by a JSON template structure with the
/// tags accepted by its template type.
///
/// The result is a fresh set of copies of the accepted declarations whose
/// names are referenced; it is never a superset of either side.
pub fn extract_merge_tags(
    json_structure: &str,
    accepted: &[MergeTag],
) -> Result<BTreeSet<MergeTag>, ExtractionError> {
    serde_json::from_str::<serde_json::Value>(json_structure)?;

    let found = referenced_identifiers(json_structure)?;

    let tags: BTreeSet<MergeTag> = accepted
        .iter()
        .filter(|tag| found.contains(tag.name()))
        .cloned()
        .collect();

    tracing::debug!(
        referenced = found.len(),
        accepted = accepted.len(),
        resolved = tags.len(),
        "Merge tags extracted"
    );

    Ok(tags)
}
