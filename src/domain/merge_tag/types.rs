//! Merge tag declarations and valued (custom) merge tags

use std::fmt;

use serde::{Deserialize, Serialize};

use super::short_code::ShortCode;
use super::value::{parse, parse_first, TagType, TagValue};
use super::{MergeTagError, MergeTagResult};

/// A string guaranteed to contain at least one non-whitespace character
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Wrap `value`, naming `field` in the error when it is blank
    pub fn new(value: impl Into<String>, field: &'static str) -> MergeTagResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(MergeTagError::Empty(field));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = MergeTagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value, "value")
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// A named, typed placeholder declaration.
///
/// Immutable value object; equality covers name, short code and type.
/// Serialized as `{ "name", "shortCode", "typeName" }`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeTag {
    name: NonEmptyString,
    short_code: ShortCode,
    #[serde(rename = "typeName")]
    tag_type: TagType,
}

impl MergeTag {
    /// Declare a tag with a short code generated from its name
    pub fn new(name: &str, tag_type: TagType) -> MergeTagResult<Self> {
        let name = NonEmptyString::new(name.trim(), "merge tag name")?;
        let short_code = ShortCode::generate(name.as_str())?;
        Ok(Self {
            name,
            short_code,
            tag_type,
        })
    }

    /// Rebuild a tag from stored parts
    pub fn with_short_code(
        name: &str,
        short_code: ShortCode,
        tag_type: TagType,
    ) -> MergeTagResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name, "merge tag name")?,
            short_code,
            tag_type,
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn short_code(&self) -> &ShortCode {
        &self.short_code
    }

    pub fn tag_type(&self) -> TagType {
        self.tag_type
    }

    /// Whether the tag's value becomes an inline linked resource
    pub fn is_resource(&self) -> bool {
        self.tag_type.is_resource()
    }
}

/// A merge tag carrying a concrete value, such as owner-level custom data.
///
/// The value is kept both as its canonical string and resolved against the
/// declared type, so the string and typed construction paths agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredCustomMergeTag", into = "StoredCustomMergeTag")]
pub struct CustomMergeTag {
    tag: MergeTag,
    string_value: NonEmptyString,
    value: TagValue,
}

impl CustomMergeTag {
    /// Build from an already typed value; the declared type follows the value
    pub fn from_value(name: &str, value: TagValue) -> MergeTagResult<Self> {
        let tag_type = value.tag_type();
        Self::from_string(name, tag_type, &value.to_invariant_string())
    }

    /// Build from a raw string parsed against `tag_type`
    pub fn from_string(name: &str, tag_type: TagType, raw: &str) -> MergeTagResult<Self> {
        let tag = MergeTag::new(name, tag_type)?;
        Self::with_tag(tag, raw)
    }

    /// Build from a raw string, inferring the first scalar type that parses
    pub fn infer(name: &str, raw: &str) -> MergeTagResult<Self> {
        let value = parse_first(raw, &TagType::PRIMITIVES)?;
        Self::from_value(name, value)
    }

    /// Attach a value to an existing declaration
    pub fn with_tag(tag: MergeTag, raw: &str) -> MergeTagResult<Self> {
        NonEmptyString::new(raw, "merge tag value")?;
        let value = parse(raw, tag.tag_type())?;
        let string_value = NonEmptyString::new(value.to_invariant_string(), "merge tag value")?;
        Ok(Self {
            tag,
            string_value,
            value,
        })
    }

    pub fn tag(&self) -> &MergeTag {
        &self.tag
    }

    pub fn name(&self) -> &str {
        self.tag.name()
    }

    pub fn tag_type(&self) -> TagType {
        self.tag.tag_type()
    }

    /// Canonical string form of the value
    pub fn string_value(&self) -> &str {
        self.string_value.as_str()
    }

    pub fn value(&self) -> &TagValue {
        &self.value
    }

    pub fn is_resource(&self) -> bool {
        self.value.is_resource()
    }
}

/// Storage shape of a [`CustomMergeTag`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCustomMergeTag {
    #[serde(flatten)]
    tag: MergeTag,
    value: String,
}

impl TryFrom<StoredCustomMergeTag> for CustomMergeTag {
    type Error = MergeTagError;

    fn try_from(stored: StoredCustomMergeTag) -> Result<Self, Self::Error> {
        CustomMergeTag::with_tag(stored.tag, &stored.value)
    }
}

impl From<CustomMergeTag> for StoredCustomMergeTag {
    fn from(custom: CustomMergeTag) -> Self {
        StoredCustomMergeTag {
            tag: custom.tag,
            value: custom.string_value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_merge_tag_generates_short_code() {
        let tag = MergeTag::new("first_name", TagType::String).unwrap();
        assert_eq!(tag.name(), "first_name");
        assert_eq!(tag.short_code().as_str(), "{{first_name}}");
        assert!(!tag.is_resource());
    }

    #[test]
    fn test_merge_tag_rejects_blank_name() {
        assert_eq!(
            MergeTag::new("  ", TagType::String),
            Err(MergeTagError::Empty("merge tag name"))
        );
    }

    #[test]
    fn test_merge_tag_equality_includes_type() {
        let a = MergeTag::new("amount", TagType::Double).unwrap();
        let b = MergeTag::new("amount", TagType::String).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, MergeTag::new("amount", TagType::Double).unwrap());
    }

    #[test]
    fn test_merge_tag_json_shape() {
        let tag = MergeTag::new("photo", TagType::Image).unwrap();
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "photo", "shortCode": "{{photo}}", "typeName": "Image"})
        );
    }

    #[test]
    fn test_construction_paths_agree() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let typed = CustomMergeTag::from_value("start", TagValue::DateOnly(date)).unwrap();
        let parsed = CustomMergeTag::from_string("start", TagType::DateOnly, "2021-01-01").unwrap();

        assert_eq!(typed.string_value(), parsed.string_value());
        assert_eq!(typed.value(), parsed.value());
        assert_eq!(typed, parsed);
    }

    #[test]
    fn test_string_value_is_canonical() {
        let tag = CustomMergeTag::from_string("active", TagType::Bool, "TRUE").unwrap();
        assert_eq!(tag.string_value(), "true");
        assert_eq!(tag.value(), &TagValue::Bool(true));
    }

    #[test]
    fn test_custom_tag_rejects_bad_values() {
        assert!(matches!(
            CustomMergeTag::from_string("count", TagType::Double, "many"),
            Err(MergeTagError::Parse(_))
        ));
        assert_eq!(
            CustomMergeTag::from_string("note", TagType::String, " "),
            Err(MergeTagError::Empty("merge tag value"))
        );
    }

    #[test]
    fn test_infer_uses_type_order() {
        let tag = CustomMergeTag::infer("due", "2024-06-30").unwrap();
        assert_eq!(tag.tag_type(), TagType::DateOnly);

        let tag = CustomMergeTag::infer("city", "Rome").unwrap();
        assert_eq!(tag.tag_type(), TagType::String);
    }

    #[test]
    fn test_custom_tag_serde_round_trip() {
        let tag = CustomMergeTag::from_string("photo", TagType::Image, "AQID").unwrap();
        let json = serde_json::to_string(&tag).unwrap();
        let back: CustomMergeTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
        assert!(back.is_resource());
    }
}
