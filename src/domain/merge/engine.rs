//! Render-time merge of declared tags, runtime arguments and owner data.
//!
//! Values are partitioned by whether the declared merge tag is an image.
//! Image values become inline [`LinkedResource`]s addressed as
//! `cid:<identifier>`; every other value goes into the flat scalar map
//! handed to the substitution engine.
//!
//! Sources are merged owner data first, runtime arguments second, so a
//! runtime argument overrides owner data of the same name.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::merge_tag::{CustomMergeTag, MergeTag};

use super::resource::{LinkedResource, ResourceDescriptor};
use super::substitution::{CompiledTemplate, PlaceholderEngine, TemplateEngine};
use super::text::to_plain_text;
use super::MergeResult;

/// Default cap for a single inline resource (5 MiB)
pub const DEFAULT_MAX_INLINE_BYTES: usize = 5 * 1024 * 1024;

/// Options controlling the merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Keep unresolved `{{identifier}}` placeholders instead of blanking them
    pub keep_unresolved_placeholders: bool,

    /// HTML-escape scalar values substituted into the body
    pub escape_html: bool,

    /// Largest decoded inline resource accepted
    pub max_inline_image_bytes: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            keep_unresolved_placeholders: false,
            escape_html: true,
            max_inline_image_bytes: DEFAULT_MAX_INLINE_BYTES,
        }
    }
}

/// Merge data partitioned for rendering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedMerge {
    /// Values substituted directly into the template
    pub scalars: BTreeMap<String, String>,

    /// Inline resources produced from image values
    pub linked_resources: Vec<LinkedResource>,
}

/// Runtime data supplied when sending
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Flat, already stringified merge tag arguments
    #[serde(default)]
    pub arguments: HashMap<String, String>,

    /// Additional inline resources
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
}

/// The composed output handed to the mail transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub plain_text: String,
    pub linked_resources: Vec<LinkedResource>,
}

/// Partition runtime arguments and owner data against the declared tags.
///
/// Runtime arguments named after a declared image tag, and owner image data
/// named after one, are decoded into linked resources; a value that fails
/// base64 decoding aborts the merge. Owner scalar data always goes to
/// substitution, even when its name matches an image tag. Owner image data
/// that this content does not declare is dropped so raw payloads never
/// reach scalar substitution.
pub fn prepare_merge(
    merge_tags: &BTreeSet<MergeTag>,
    arguments: &HashMap<String, String>,
    custom_data: &[CustomMergeTag],
    max_inline_bytes: usize,
) -> MergeResult<PreparedMerge> {
    let image_tags: BTreeSet<&str> = merge_tags
        .iter()
        .filter(|tag| tag.is_resource())
        .map(|tag| tag.name())
        .collect();

    let mut images: BTreeMap<&str, &str> = BTreeMap::new();
    let mut scalars: BTreeMap<String, String> = BTreeMap::new();

    for custom in custom_data {
        if custom.is_resource() {
            if image_tags.contains(custom.name()) {
                images.insert(custom.name(), custom.string_value());
            }
        } else {
            scalars.insert(custom.name().to_string(), custom.string_value().to_string());
        }
    }

    // BTreeMap view keeps the override order independent of hash order
    let arguments: BTreeMap<&String, &String> = arguments.iter().collect();
    for (name, value) in arguments {
        if image_tags.contains(name.as_str()) {
            scalars.remove(name.as_str());
            images.insert(name.as_str(), value.as_str());
        } else {
            scalars.insert(name.clone(), value.clone());
        }
    }

    let linked_resources = images
        .into_iter()
        .map(|(name, encoded)| LinkedResource::from_image_tag(name, encoded, max_inline_bytes))
        .collect::<MergeResult<Vec<_>>>()?;

    Ok(PreparedMerge {
        scalars,
        linked_resources,
    })
}

/// Merge and render a compiled template.
///
/// Returns the rendered HTML and the inline resources it references.
pub fn merge(
    compiled: &dyn CompiledTemplate,
    merge_tags: &BTreeSet<MergeTag>,
    arguments: &HashMap<String, String>,
    custom_data: &[CustomMergeTag],
    max_inline_bytes: usize,
) -> MergeResult<(String, Vec<LinkedResource>)> {
    let prepared = prepare_merge(merge_tags, arguments, custom_data, max_inline_bytes)?;
    let html = compiled.render(&prepared.scalars);
    Ok((html, prepared.linked_resources))
}

/// Renders body contents into complete emails
#[derive(Clone)]
pub struct MergeEngine {
    engine: Arc<dyn TemplateEngine>,
    subject_engine: PlaceholderEngine,
    options: MergeOptions,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(MergeOptions::default())
    }
}

impl MergeEngine {
    /// Engine using the built-in placeholder substitution
    pub fn new(options: MergeOptions) -> Self {
        let engine = PlaceholderEngine {
            keep_unresolved: options.keep_unresolved_placeholders,
            escape_html: options.escape_html,
        };
        Self::with_engine(Arc::new(engine), options)
    }

    /// Engine delegating body rendering to a custom substitution engine
    pub fn with_engine(engine: Arc<dyn TemplateEngine>, options: MergeOptions) -> Self {
        let subject_engine =
            PlaceholderEngine::plain().keep_unresolved(options.keep_unresolved_placeholders);
        Self {
            engine,
            subject_engine,
            options,
        }
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Compile the body source with the configured engine
    pub fn compile(&self, body: &str) -> MergeResult<Box<dyn CompiledTemplate>> {
        self.engine.compile(body)
    }

    /// Render subject and body, collecting image tags and request resources
    /// as linked resources. Nothing is returned unless every resource decodes.
    pub fn render(
        &self,
        subject: &str,
        body: &str,
        merge_tags: &BTreeSet<MergeTag>,
        request: &RenderRequest,
        custom_data: &[CustomMergeTag],
    ) -> MergeResult<RenderedEmail> {
        let max_bytes = self.options.max_inline_image_bytes;
        let prepared = prepare_merge(merge_tags, &request.arguments, custom_data, max_bytes)?;

        let mut linked_resources = prepared.linked_resources;
        for descriptor in &request.resources {
            linked_resources.push(descriptor.to_linked_resource(max_bytes)?);
        }

        let compiled = self.compile(body)?;
        let html = compiled.render(&prepared.scalars);
        let subject = self
            .subject_engine
            .compile(subject)?
            .render(&prepared.scalars);

        tracing::debug!(
            scalars = prepared.scalars.len(),
            resources = linked_resources.len(),
            "Email rendered"
        );

        Ok(RenderedEmail {
            subject,
            plain_text: to_plain_text(&html),
            html,
            linked_resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merge::MergeError;
    use crate::domain::merge_tag::TagType;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use std::sync::Mutex;

    const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xDB];

    /// Records the scalar map it is rendered with
    #[derive(Default)]
    struct RecordingTemplate {
        seen: Mutex<Option<BTreeMap<String, String>>>,
    }

    impl CompiledTemplate for RecordingTemplate {
        fn render(&self, values: &BTreeMap<String, String>) -> String {
            *self.seen.lock().unwrap() = Some(values.clone());
            "rendered".to_string()
        }
    }

    fn tags() -> BTreeSet<MergeTag> {
        [
            MergeTag::new("name", TagType::String).unwrap(),
            MergeTag::new("photo", TagType::Image).unwrap(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_image_values_are_separated() {
        let arguments = HashMap::from([("name".to_string(), "Alice".to_string())]);
        let custom = vec![CustomMergeTag::from_string(
            "photo",
            TagType::Image,
            &STANDARD.encode(JPEG),
        )
        .unwrap()];

        let template = RecordingTemplate::default();
        let (html, resources) =
            merge(&template, &tags(), &arguments, &custom, DEFAULT_MAX_INLINE_BYTES).unwrap();

        assert_eq!(html, "rendered");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].media_type, "image/jpeg");
        assert_eq!(resources[0].content_id, "photo");

        let seen = template.seen.lock().unwrap().clone().unwrap();
        assert_eq!(
            seen,
            BTreeMap::from([("name".to_string(), "Alice".to_string())])
        );
    }

    #[test]
    fn test_arguments_override_custom_data() {
        let arguments = HashMap::from([("name".to_string(), "Bob".to_string())]);
        let custom = vec![CustomMergeTag::from_string("name", TagType::String, "Alice").unwrap()];

        let prepared =
            prepare_merge(&tags(), &arguments, &custom, DEFAULT_MAX_INLINE_BYTES).unwrap();
        assert_eq!(prepared.scalars["name"], "Bob");
    }

    #[test]
    fn test_runtime_image_argument() {
        let arguments = HashMap::from([("photo".to_string(), STANDARD.encode(JPEG))]);
        let prepared =
            prepare_merge(&tags(), &arguments, &[], DEFAULT_MAX_INLINE_BYTES).unwrap();
        assert!(prepared.scalars.is_empty());
        assert_eq!(prepared.linked_resources.len(), 1);
    }

    #[test]
    fn test_invalid_image_aborts() {
        let arguments = HashMap::from([("photo".to_string(), "%%%".to_string())]);
        assert!(matches!(
            prepare_merge(&tags(), &arguments, &[], DEFAULT_MAX_INLINE_BYTES),
            Err(MergeError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_undeclared_owner_image_is_dropped() {
        let custom = vec![CustomMergeTag::from_string("logo", TagType::Image, "AQID").unwrap()];
        let prepared = prepare_merge(&tags(), &HashMap::new(), &custom, 1024).unwrap();
        assert!(prepared.scalars.is_empty());
        assert!(prepared.linked_resources.is_empty());
    }

    #[test]
    fn test_owner_scalar_named_like_image_tag_stays_scalar() {
        for value in ["hello", "abcd"] {
            let custom = vec![CustomMergeTag::from_string("photo", TagType::String, value).unwrap()];
            let prepared =
                prepare_merge(&tags(), &HashMap::new(), &custom, DEFAULT_MAX_INLINE_BYTES).unwrap();

            assert!(prepared.linked_resources.is_empty());
            assert_eq!(prepared.scalars["photo"], value);
        }
    }

    #[test]
    fn test_undeclared_scalars_pass_through() {
        let custom = vec![CustomMergeTag::from_string("company", TagType::String, "Acme").unwrap()];
        let prepared = prepare_merge(&tags(), &HashMap::new(), &custom, 1024).unwrap();
        assert_eq!(prepared.scalars["company"], "Acme");
    }

    #[test]
    fn test_render_email() {
        let engine = MergeEngine::default();
        let request = RenderRequest {
            arguments: HashMap::from([("name".to_string(), "Alice & Co".to_string())]),
            resources: vec![],
        };
        let custom = vec![CustomMergeTag::from_string(
            "photo",
            TagType::Image,
            &STANDARD.encode(JPEG),
        )
        .unwrap()];

        let email = engine
            .render(
                "Welcome {{name}}",
                "<p>Hi {{name}}</p><img src=\"cid:photo\">{{missing}}",
                &tags(),
                &request,
                &custom,
            )
            .unwrap();

        assert_eq!(email.subject, "Welcome Alice & Co");
        assert_eq!(email.html, "<p>Hi Alice &amp; Co</p><img src=\"cid:photo\">");
        assert_eq!(email.plain_text, "Hi Alice & Co");
        assert_eq!(email.linked_resources.len(), 1);
    }
}
