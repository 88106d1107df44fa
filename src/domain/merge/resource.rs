//! Inline linked resources embedded in rendered HTML

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MergeError, MergeResult};

/// Fallback media type when the payload is not a recognised image
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Binary payload or remote source of a linked resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "data")]
pub enum ResourcePayload {
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
    Url(String),
}

/// A content-id addressed resource referenced from HTML as `cid:<content_id>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedResource {
    /// Content-ID header value, without angle brackets
    pub content_id: String,

    /// MIME type of the payload
    pub media_type: String,

    /// Resource content
    pub payload: ResourcePayload,

    /// Alternative text for the embedding `<img>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

impl LinkedResource {
    /// Decode a base64 image value held by merge tag `name`.
    ///
    /// The tag identifier doubles as the content-id, so templates reference
    /// the image as `cid:<name>`.
    pub fn from_image_tag(name: &str, encoded: &str, max_bytes: usize) -> MergeResult<Self> {
        let bytes = decode_image(name, encoded, max_bytes)?;
        Ok(Self {
            content_id: name.to_string(),
            media_type: detect_media_type(&bytes).to_string(),
            payload: ResourcePayload::Bytes(bytes),
            alt_text: None,
        })
    }

    /// `cid:` URL for use in `src` attributes
    pub fn cid_url(&self) -> String {
        format!("cid:{}", self.content_id)
    }

    pub fn size(&self) -> usize {
        match &self.payload {
            ResourcePayload::Bytes(bytes) => bytes.len(),
            ResourcePayload::Url(_) => 0,
        }
    }
}

/// How a [`ResourceDescriptor`] value is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceEncoding {
    #[default]
    Base64,
    Url,
}

/// Caller-supplied resource attached at render time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Base64 payload or source URL, depending on `encoding`
    pub value: String,

    /// Alternative text (optional)
    #[serde(default)]
    pub alt_text: Option<String>,

    /// Declared media type; detected from the payload when absent
    #[serde(default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub encoding: ResourceEncoding,
}

impl ResourceDescriptor {
    /// Turn the descriptor into a linked resource with a fresh content-id
    pub fn to_linked_resource(&self, max_bytes: usize) -> MergeResult<LinkedResource> {
        let content_id = Uuid::new_v4().simple().to_string();

        let (payload, detected) = match self.encoding {
            ResourceEncoding::Base64 => {
                let bytes = decode_image(&content_id, &self.value, max_bytes)?;
                let detected = detect_media_type(&bytes);
                (ResourcePayload::Bytes(bytes), detected)
            }
            ResourceEncoding::Url => (ResourcePayload::Url(self.value.clone()), OCTET_STREAM),
        };

        Ok(LinkedResource {
            content_id,
            media_type: self
                .media_type
                .clone()
                .unwrap_or_else(|| detected.to_string()),
            payload,
            alt_text: self.alt_text.clone(),
        })
    }
}

fn decode_image(name: &str, encoded: &str, max_bytes: usize) -> MergeResult<Vec<u8>> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|source| MergeError::InvalidImage {
            name: name.to_string(),
            source,
        })?;

    if bytes.is_empty() {
        return Err(MergeError::EmptyResource {
            name: name.to_string(),
        });
    }

    if bytes.len() > max_bytes {
        return Err(MergeError::ResourceTooLarge {
            name: name.to_string(),
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    Ok(bytes)
}

/// Detect an image media type from its leading bytes
pub fn detect_media_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [b'B', b'M', ..] => "image/bmp",
        _ if looks_like_svg(bytes) => "image/svg+xml",
        _ => OCTET_STREAM,
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
