//! Culture-specific body content of an email template

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::merge::{MergeEngine, RenderRequest, RenderedEmail};
use crate::domain::merge_tag::{extract_merge_tags, CustomMergeTag, MergeTag};

use super::types::{BodyContentDraft, TemplateResult};

/// Resolve the merge tags a JSON structure uses out of the accepted set.
///
/// Invoked at every content mutation; the result is never cached across
/// changes of the accepted set.
pub fn recompute_merge_tags(
    json_structure: &str,
    accepted: &[MergeTag],
) -> TemplateResult<BTreeSet<MergeTag>> {
    Ok(extract_merge_tags(json_structure, accepted)?)
}

/// Subject, body and editor structure for one culture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailBodyContent {
    id: Uuid,
    culture_code: String,
    subject: String,
    body: String,
    json_structure: String,
    merge_tags: BTreeSet<MergeTag>,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EmailBodyContent {
    /// Build a content from a draft, resolving its merge tags against the
    /// accepted set of the owning template type
    pub fn new(draft: BodyContentDraft, accepted: &[MergeTag]) -> TemplateResult<Self> {
        draft.validate()?;
        let merge_tags = recompute_merge_tags(&draft.json_structure, accepted)?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            culture_code: draft.culture_code,
            subject: draft.subject,
            body: draft.body,
            json_structure: draft.json_structure,
            merge_tags,
            is_default: draft.is_default,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild a stored content; merge tags are taken as persisted
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        culture_code: String,
        subject: String,
        body: String,
        json_structure: String,
        merge_tags: BTreeSet<MergeTag>,
        is_default: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            culture_code,
            subject,
            body,
            json_structure,
            merge_tags,
            is_default,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn culture_code(&self) -> &str {
        &self.culture_code
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn json_structure(&self) -> &str {
        &self.json_structure
    }

    pub fn merge_tags(&self) -> &BTreeSet<MergeTag> {
        &self.merge_tags
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Render this content for sending
    pub fn render(
        &self,
        engine: &MergeEngine,
        request: &RenderRequest,
        custom_data: &[CustomMergeTag],
    ) -> TemplateResult<RenderedEmail> {
        Ok(engine.render(
            &self.subject,
            &self.body,
            &self.merge_tags,
            request,
            custom_data,
        )?)
    }

    /// Replace the sources in place, keeping identity. A draft that does not
    /// ask to be default leaves the current flag alone.
    pub(crate) fn apply(&mut self, draft: BodyContentDraft, merge_tags: BTreeSet<MergeTag>) {
        self.subject = draft.subject;
        self.body = draft.body;
        self.json_structure = draft.json_structure;
        self.merge_tags = merge_tags;
        if draft.is_default {
            self.is_default = true;
        }
        self.updated_at = Utc::now();
    }

    pub(crate) fn set_default(&mut self, is_default: bool) {
        if self.is_default != is_default {
            self.is_default = is_default;
            self.updated_at = Utc::now();
        }
    }

    pub(crate) fn set_merge_tags(&mut self, merge_tags: BTreeSet<MergeTag>) {
        if self.merge_tags != merge_tags {
            self.merge_tags = merge_tags;
            self.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merge_tag::TagType;
    use crate::domain::template::TemplateError;

    fn accepted() -> Vec<MergeTag> {
        vec![
            MergeTag::new("name", TagType::String).unwrap(),
            MergeTag::new("total", TagType::Double).unwrap(),
        ]
    }

    #[test]
    fn test_new_resolves_merge_tags() {
        let draft = BodyContentDraft::new(
            "en-US",
            "Hi {{name}}",
            "<p>Hi {{name}}</p>",
            r#"{"text":"Hi {{name}} {{other}}"}"#,
        );
        let content = EmailBodyContent::new(draft, &accepted()).unwrap();

        let names: Vec<_> = content.merge_tags().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["name"]);
        assert!(!content.is_default());
    }

    #[test]
    fn test_new_rejects_malformed_structure() {
        let draft = BodyContentDraft::new("en-US", "Hi", "<p>Hi</p>", "{not json");
        assert!(matches!(
            EmailBodyContent::new(draft, &accepted()),
            Err(TemplateError::Extraction(_))
        ));
    }

    #[test]
    fn test_apply_keeps_identity_and_default() {
        let draft = BodyContentDraft::new("en-US", "Hi", "<p>Hi</p>", "{}").as_default();
        let mut content = EmailBodyContent::new(draft, &accepted()).unwrap();
        let id = content.id();

        let update = BodyContentDraft::new("en-US", "Total", "<p>{{total}}</p>", r#"{"t":"{{total}}"}"#);
        let tags = recompute_merge_tags(&update.json_structure, &accepted()).unwrap();
        content.apply(update, tags);

        assert_eq!(content.id(), id);
        assert_eq!(content.subject(), "Total");
        assert!(content.is_default());
        assert_eq!(content.merge_tags().len(), 1);
    }
}
