//! Typed string parsing for merge tag values.
//!
//! Merge tag values travel as strings (runtime arguments, stored owner data)
//! and are resolved against a declared [`TagType`] using culture-invariant
//! rules. When several types are acceptable, candidates are probed in the
//! fixed order of [`TagType::ALL`], so `"2024-01-01"` resolves to a date
//! before it could resolve to a date-time.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while converting raw strings into typed values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("'{raw}' is not a valid {expected}")]
    Invalid { raw: String, expected: TagType },

    #[error("'{0}' does not match any candidate type")]
    Unparseable(String),

    #[error("Unknown merge tag type: {0}")]
    UnknownType(String),
}

/// Supported merge tag value kinds.
///
/// Declaration order is the probe order used by [`parse_first`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TagType {
    DateOnly,
    TimeOnly,
    DateTime,
    Guid,
    Double,
    Bool,
    String,
    /// Binary image carried as base64, rendered as an inline linked resource
    Image,
}

impl TagType {
    /// Scalar kinds, in probe order
    pub const PRIMITIVES: [TagType; 7] = [
        TagType::DateOnly,
        TagType::TimeOnly,
        TagType::DateTime,
        TagType::Guid,
        TagType::Double,
        TagType::Bool,
        TagType::String,
    ];

    /// Every kind, in probe order. `Image` comes last and is never reached
    /// when `String` is also a candidate.
    pub const ALL: [TagType; 8] = [
        TagType::DateOnly,
        TagType::TimeOnly,
        TagType::DateTime,
        TagType::Guid,
        TagType::Double,
        TagType::Bool,
        TagType::String,
        TagType::Image,
    ];

    /// Stable type name used in storage
    pub fn name(&self) -> &'static str {
        match self {
            TagType::DateOnly => "DateOnly",
            TagType::TimeOnly => "TimeOnly",
            TagType::DateTime => "DateTime",
            TagType::Guid => "Guid",
            TagType::Double => "Double",
            TagType::Bool => "Bool",
            TagType::String => "String",
            TagType::Image => "Image",
        }
    }

    /// Whether values of this kind become linked resources instead of text
    pub fn is_resource(&self) -> bool {
        matches!(self, TagType::Image)
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TagType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ParseError::UnknownType(s.to_string()))
    }
}

/// A resolved merge tag value
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    DateOnly(NaiveDate),
    TimeOnly(NaiveTime),
    DateTime(NaiveDateTime),
    Guid(Uuid),
    Double(f64),
    Bool(bool),
    String(String),
    Image(Vec<u8>),
}

impl TagValue {
    /// The kind this value belongs to
    pub fn tag_type(&self) -> TagType {
        match self {
            TagValue::DateOnly(_) => TagType::DateOnly,
            TagValue::TimeOnly(_) => TagType::TimeOnly,
            TagValue::DateTime(_) => TagType::DateTime,
            TagValue::Guid(_) => TagType::Guid,
            TagValue::Double(_) => TagType::Double,
            TagValue::Bool(_) => TagType::Bool,
            TagValue::String(_) => TagType::String,
            TagValue::Image(_) => TagType::Image,
        }
    }

    pub fn is_resource(&self) -> bool {
        self.tag_type().is_resource()
    }

    /// Canonical culture-invariant text. Parsing it back with
    /// [`parse`] yields an equal value.
    pub fn to_invariant_string(&self) -> String {
        match self {
            TagValue::DateOnly(d) => d.format(DATE_FORMAT).to_string(),
            TagValue::TimeOnly(t) => format_time(t),
            TagValue::DateTime(dt) => format!(
                "{}T{}",
                dt.date().format(DATE_FORMAT),
                format_time(&dt.time())
            ),
            TagValue::Guid(g) => g.hyphenated().to_string(),
            TagValue::Double(v) => v.to_string(),
            TagValue::Bool(b) => b.to_string(),
            TagValue::String(s) => s.clone(),
            TagValue::Image(bytes) => STANDARD.encode(bytes),
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_invariant_string())
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

const DATE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

fn format_time(t: &NaiveTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.f").to_string()
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        // A bare date is a valid date-time at midnight
        .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn parse_double(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_image(s: &str) -> Option<Vec<u8>> {
    STANDARD.decode(s).ok().filter(|bytes| !bytes.is_empty())
}

/// Parse `raw` as the given type.
///
/// Surrounding whitespace is ignored for every kind except `String`,
/// which is taken verbatim.
pub fn parse(raw: &str, target: TagType) -> Result<TagValue, ParseError> {
    let s = raw.trim();

    let value = match target {
        TagType::DateOnly => parse_date(s).map(TagValue::DateOnly),
        TagType::TimeOnly => parse_time(s).map(TagValue::TimeOnly),
        TagType::DateTime => parse_date_time(s).map(TagValue::DateTime),
        TagType::Guid => Uuid::parse_str(s).ok().map(TagValue::Guid),
        TagType::Double => parse_double(s).map(TagValue::Double),
        TagType::Bool => parse_bool(s).map(TagValue::Bool),
        TagType::String => Some(TagValue::String(raw.to_string())),
        TagType::Image => parse_image(s).map(TagValue::Image),
    };

    value.ok_or_else(|| ParseError::Invalid {
        raw: raw.to_string(),
        expected: target,
    })
}

/// Parse `raw` against a set of candidate types.
///
/// Candidates are tried in [`TagType::ALL`] order regardless of the order
/// they are passed in; the first success wins.
pub fn parse_first(raw: &str, candidates: &[TagType]) -> Result<TagValue, ParseError> {
    TagType::ALL
        .into_iter()
        .filter(|t| candidates.contains(t))
        .find_map(|t| parse(raw, t).ok())
        .ok_or_else(|| ParseError::Unparseable(raw.to_string()))
}

/// Parse a JSON argument against a set of candidate types.
///
/// Scalars are probed through their text form. Objects, arrays and `null`
/// fail every typed candidate and fall back to their JSON text when
/// `String` is a candidate.
pub fn parse_json_value(
    value: &serde_json::Value,
    candidates: &[TagType],
) -> Result<TagValue, ParseError> {
    match value {
        serde_json::Value::String(s) => parse_first(s, candidates),
        serde_json::Value::Number(n) => parse_first(&n.to_string(), candidates),
        serde_json::Value::Bool(b) => parse_first(&b.to_string(), candidates),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            if candidates.contains(&TagType::String) {
                Ok(TagValue::String(value.to_string()))
            } else {
                Err(ParseError::Unparseable(value.to_string()))
            }
        }
    }
}
