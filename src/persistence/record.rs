//! Storage shapes for template aggregates.
//!
//! Body and JSON structure sources are stored deflate-compressed; merge tags
//! are stored as a JSON array of `{ name, shortCode, typeName }`.

use std::collections::BTreeSet;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::merge_tag::{MergeTag, ShortCode, TagType};
use crate::domain::template::{EmailBodyContent, EmailTemplate, TemplateType};

use super::{PersistenceError, PersistenceResult};

/// Deflate-compress a text source
pub fn compress(text: &str) -> PersistenceResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    Ok(encoder.finish()?)
}

/// Inflate a source written by [`compress`]
pub fn decompress(bytes: &[u8]) -> PersistenceResult<String> {
    let mut decoder = DeflateDecoder::new(bytes);
    let mut buffer = Vec::new();
    decoder.read_to_end(&mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Stored merge tag; the type name is checked when loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeTagRecord {
    pub name: String,
    pub short_code: String,
    pub type_name: String,
}

impl From<&MergeTag> for MergeTagRecord {
    fn from(tag: &MergeTag) -> Self {
        Self {
            name: tag.name().to_string(),
            short_code: tag.short_code().as_str().to_string(),
            type_name: tag.tag_type().name().to_string(),
        }
    }
}

impl TryFrom<MergeTagRecord> for MergeTag {
    type Error = PersistenceError;

    fn try_from(record: MergeTagRecord) -> Result<Self, Self::Error> {
        let tag_type: TagType = record
            .type_name
            .parse()
            .map_err(|_| PersistenceError::UnknownTagType(record.type_name.clone()))?;
        let short_code = ShortCode::new(record.short_code)?;
        Ok(MergeTag::with_short_code(&record.name, short_code, tag_type)?)
    }
}

fn encode_tags<'a>(tags: impl IntoIterator<Item = &'a MergeTag>) -> PersistenceResult<String> {
    let records: Vec<MergeTagRecord> = tags.into_iter().map(MergeTagRecord::from).collect();
    Ok(serde_json::to_string(&records)?)
}

fn decode_tags<C: FromIterator<MergeTag>>(json: &str) -> PersistenceResult<C> {
    let records: Vec<MergeTagRecord> = serde_json::from_str(json)?;
    records.into_iter().map(MergeTag::try_from).collect()
}

/// Stored body content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyContentRecord {
    pub id: Uuid,
    pub culture_code: String,
    pub subject: String,
    /// Deflate-compressed body source
    pub body: Vec<u8>,
    /// Deflate-compressed JSON editor structure
    pub json_structure: Vec<u8>,
    /// JSON array of merge tag records
    pub merge_tags: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BodyContentRecord {
    pub fn from_content(content: &EmailBodyContent) -> PersistenceResult<Self> {
        Ok(Self {
            id: content.id(),
            culture_code: content.culture_code().to_string(),
            subject: content.subject().to_string(),
            body: compress(content.body())?,
            json_structure: compress(content.json_structure())?,
            merge_tags: encode_tags(content.merge_tags())?,
            is_default: content.is_default(),
            created_at: content.created_at(),
            updated_at: content.updated_at(),
        })
    }

    pub fn into_content(self) -> PersistenceResult<EmailBodyContent> {
        let merge_tags: BTreeSet<MergeTag> = decode_tags(&self.merge_tags)?;
        Ok(EmailBodyContent::from_parts(
            self.id,
            self.culture_code,
            self.subject,
            decompress(&self.body)?,
            decompress(&self.json_structure)?,
            merge_tags,
            self.is_default,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// Stored email template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplateRecord {
    pub id: Uuid,
    pub template_type_id: Uuid,
    pub name: String,
    pub contents: Vec<BodyContentRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmailTemplateRecord {
    pub fn from_template(template: &EmailTemplate) -> PersistenceResult<Self> {
        Ok(Self {
            id: template.id(),
            template_type_id: template.template_type_id(),
            name: template.name().to_string(),
            contents: template
                .contents()
                .iter()
                .map(BodyContentRecord::from_content)
                .collect::<PersistenceResult<_>>()?,
            created_at: template.created_at(),
            updated_at: template.updated_at(),
        })
    }

    pub fn into_template(self) -> PersistenceResult<EmailTemplate> {
        let contents = self
            .contents
            .into_iter()
            .map(BodyContentRecord::into_content)
            .collect::<PersistenceResult<Vec<_>>>()?;
        Ok(EmailTemplate::from_parts(
            self.id,
            self.template_type_id,
            self.name,
            contents,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// Stored template type with its templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTypeRecord {
    pub id: Uuid,
    pub name: String,
    /// JSON array of merge tag records
    pub accepted_tags: String,
    pub templates: Vec<EmailTemplateRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateTypeRecord {
    pub fn from_template_type(template_type: &TemplateType) -> PersistenceResult<Self> {
        Ok(Self {
            id: template_type.id(),
            name: template_type.name().to_string(),
            accepted_tags: encode_tags(template_type.accepted_tags())?,
            templates: template_type
                .templates()
                .iter()
                .map(EmailTemplateRecord::from_template)
                .collect::<PersistenceResult<_>>()?,
            created_at: template_type.created_at(),
            updated_at: template_type.updated_at(),
        })
    }

    pub fn into_template_type(self) -> PersistenceResult<TemplateType> {
        let accepted_tags: Vec<MergeTag> = decode_tags(&self.accepted_tags)?;
        let templates = self
            .templates
            .into_iter()
            .map(EmailTemplateRecord::into_template)
            .collect::<PersistenceResult<Vec<_>>>()?;
        Ok(TemplateType::from_parts(
            self.id,
            self.name,
            accepted_tags,
            templates,
            self.created_at,
            self.updated_at,
        ))
    }
}
