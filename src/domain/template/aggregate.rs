//! Template type and email template aggregates.
//!
//! A [`TemplateType`] owns its accepted merge tags and its templates; an
//! [`EmailTemplate`] owns its body contents. Once a template has any
//! content, exactly one content is marked default.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::merge_tag::MergeTag;

use super::content::{recompute_merge_tags, EmailBodyContent};
use super::types::{validate_name, BodyContentDraft, TemplateError, TemplateResult};

// ============================================================================
// Email Template
// ============================================================================

/// An email template with one body content per culture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailTemplate {
    id: Uuid,
    template_type_id: Uuid,
    name: String,
    contents: Vec<EmailBodyContent>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EmailTemplate {
    /// Create a template with its initial content, which always becomes default
    pub fn new(
        template_type_id: Uuid,
        name: &str,
        initial: BodyContentDraft,
        accepted: &[MergeTag],
    ) -> TemplateResult<Self> {
        validate_name(name)?;
        let content = EmailBodyContent::new(initial, accepted)?;
        let now = Utc::now();

        let mut template = Self {
            id: Uuid::new_v4(),
            template_type_id,
            name: name.trim().to_string(),
            contents: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        template.insert(content);

        Ok(template)
    }

    /// Rebuild a stored template.
    ///
    /// The default flag is normalised so a loaded template still holds
    /// exactly one default content.
    pub fn from_parts(
        id: Uuid,
        template_type_id: Uuid,
        name: String,
        contents: Vec<EmailBodyContent>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut template = Self {
            id,
            template_type_id,
            name,
            contents,
            created_at,
            updated_at,
        };
        template.normalize_default();
        template
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn template_type_id(&self) -> Uuid {
        self.template_type_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &[EmailBodyContent] {
        &self.contents
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Culture codes in insertion order
    pub fn cultures(&self) -> impl Iterator<Item = &str> {
        self.contents.iter().map(|c| c.culture_code())
    }

    /// Content for an exact culture code.
    ///
    /// There is no fallback to the default content; callers wanting the
    /// default must ask for it with [`EmailTemplate::default_content`].
    pub fn content(&self, culture_code: &str) -> TemplateResult<&EmailBodyContent> {
        self.contents
            .iter()
            .find(|c| c.culture_code() == culture_code)
            .ok_or_else(|| {
                TemplateError::NotFound(format!(
                    "content for culture '{}' in template {}",
                    culture_code, self.id
                ))
            })
    }

    /// The default content, if the template has any content
    pub fn default_content(&self) -> Option<&EmailBodyContent> {
        self.contents.iter().find(|c| c.is_default())
    }

    /// Add a content for a culture that has none yet
    pub fn add_content(
        &mut self,
        draft: BodyContentDraft,
        accepted: &[MergeTag],
    ) -> TemplateResult<&EmailBodyContent> {
        if self.position(&draft.culture_code).is_some() {
            return Err(TemplateError::AlreadyExists(format!(
                "content for culture '{}' in template {}",
                draft.culture_code, self.id
            )));
        }

        let content = EmailBodyContent::new(draft, accepted)?;
        Ok(self.insert(content))
    }

    /// Replace the content of the draft's culture in place, or add it when
    /// the culture has no content yet. Merge tags are recomputed against
    /// `accepted`; nothing changes if that fails.
    pub fn upsert_content(
        &mut self,
        draft: BodyContentDraft,
        accepted: &[MergeTag],
    ) -> TemplateResult<&EmailBodyContent> {
        let Some(index) = self.position(&draft.culture_code) else {
            return self.add_content(draft, accepted);
        };

        draft.validate()?;
        let merge_tags = recompute_merge_tags(&draft.json_structure, accepted)?;

        if draft.is_default {
            self.clear_default();
        }
        self.contents[index].apply(draft, merge_tags);
        self.updated_at = Utc::now();

        Ok(&self.contents[index])
    }

    /// Remove a culture's content.
    ///
    /// The default content can only go when it is the last one.
    pub fn remove_content(&mut self, culture_code: &str) -> TemplateResult<EmailBodyContent> {
        let index = self.position(culture_code).ok_or_else(|| {
            TemplateError::NotFound(format!(
                "content for culture '{}' in template {}",
                culture_code, self.id
            ))
        })?;

        if self.contents[index].is_default() && self.contents.len() > 1 {
            return Err(TemplateError::DefaultContentRequired(
                culture_code.to_string(),
            ));
        }

        self.updated_at = Utc::now();
        Ok(self.contents.remove(index))
    }

    /// Recompute every content's merge tags against a new accepted set.
    /// All contents are resolved before any is changed.
    pub fn reconcile_merge_tags(&mut self, accepted: &[MergeTag]) -> TemplateResult<()> {
        let resolved = self
            .contents
            .iter()
            .map(|c| recompute_merge_tags(c.json_structure(), accepted))
            .collect::<TemplateResult<Vec<_>>>()?;

        for (content, merge_tags) in self.contents.iter_mut().zip(resolved) {
            content.set_merge_tags(merge_tags);
        }

        Ok(())
    }

    fn position(&self, culture_code: &str) -> Option<usize> {
        self.contents
            .iter()
            .position(|c| c.culture_code() == culture_code)
    }

    fn insert(&mut self, mut content: EmailBodyContent) -> &EmailBodyContent {
        if self.contents.is_empty() {
            content.set_default(true);
        } else if content.is_default() {
            self.clear_default();
        }

        tracing::debug!(
            template_id = %self.id,
            culture = %content.culture_code(),
            is_default = content.is_default(),
            "Body content added"
        );

        self.contents.push(content);
        self.updated_at = Utc::now();
        &self.contents[self.contents.len() - 1]
    }

    fn clear_default(&mut self) {
        for content in self.contents.iter_mut().filter(|c| c.is_default()) {
            content.set_default(false);
        }
    }

    fn normalize_default(&mut self) {
        let first_default = self.contents.iter().position(|c| c.is_default());
        let keep = first_default.unwrap_or(0);
        for (index, content) in self.contents.iter_mut().enumerate() {
            content.set_default(index == keep);
        }
    }
}

// ============================================================================
// Template Type
// ============================================================================

/// A category of templates sharing one accepted merge tag vocabulary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateType {
    id: Uuid,
    name: String,
    accepted_tags: Vec<MergeTag>,
    templates: Vec<EmailTemplate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TemplateType {
    pub fn new(name: &str) -> TemplateResult<Self> {
        validate_name(name)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            accepted_tags: Vec::new(),
            templates: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Create a type accepting the given tags
    pub fn with_merge_tags(
        name: &str,
        tags: impl IntoIterator<Item = MergeTag>,
    ) -> TemplateResult<Self> {
        let mut template_type = Self::new(name)?;
        for tag in tags {
            template_type.declare_merge_tag(tag)?;
        }
        Ok(template_type)
    }

    /// Rebuild a stored template type
    pub fn from_parts(
        id: Uuid,
        name: String,
        accepted_tags: Vec<MergeTag>,
        templates: Vec<EmailTemplate>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            accepted_tags,
            templates,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accepted_tags(&self) -> &[MergeTag] {
        &self.accepted_tags
    }

    pub fn templates(&self) -> &[EmailTemplate] {
        &self.templates
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Accept a new merge tag; names are unique within a type and must
    /// already be in short code identifier form so extraction can find them.
    /// Existing contents that already reference it pick it up.
    pub fn declare_merge_tag(&mut self, tag: MergeTag) -> TemplateResult<()> {
        if tag.short_code().identifier() != tag.name() {
            return Err(TemplateError::InvalidTemplate(format!(
                "Merge tag name '{}' must be written as '{}'",
                tag.name(),
                tag.short_code().identifier()
            )));
        }

        if self.accepted_tags.iter().any(|t| t.name() == tag.name()) {
            return Err(TemplateError::DuplicateMergeTag(tag.name().to_string()));
        }

        let mut accepted = self.accepted_tags.clone();
        accepted.push(tag);
        self.replace_accepted_tags(accepted)
    }

    /// Stop accepting a merge tag and drop it from every content
    pub fn retract_merge_tag(&mut self, name: &str) -> TemplateResult<MergeTag> {
        let index = self
            .accepted_tags
            .iter()
            .position(|t| t.name() == name)
            .ok_or_else(|| TemplateError::NotFound(format!("merge tag '{}'", name)))?;

        let mut accepted = self.accepted_tags.clone();
        let removed = accepted.remove(index);
        self.replace_accepted_tags(accepted)?;
        Ok(removed)
    }

    /// Add a template with its initial content
    pub fn add_template(
        &mut self,
        name: &str,
        initial: BodyContentDraft,
    ) -> TemplateResult<&EmailTemplate> {
        if self.templates.iter().any(|t| t.name() == name.trim()) {
            return Err(TemplateError::AlreadyExists(format!("template '{}'", name)));
        }

        let template = EmailTemplate::new(self.id, name, initial, &self.accepted_tags)?;
        tracing::info!(
            template_type_id = %self.id,
            template_id = %template.id(),
            name = %template.name(),
            "Email template created"
        );

        self.templates.push(template);
        self.updated_at = Utc::now();
        Ok(&self.templates[self.templates.len() - 1])
    }

    pub fn template(&self, id: Uuid) -> TemplateResult<&EmailTemplate> {
        self.templates
            .iter()
            .find(|t| t.id() == id)
            .ok_or_else(|| TemplateError::NotFound(format!("template {}", id)))
    }

    pub fn remove_template(&mut self, id: Uuid) -> TemplateResult<EmailTemplate> {
        let index = self
            .templates
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| TemplateError::NotFound(format!("template {}", id)))?;
        self.updated_at = Utc::now();
        Ok(self.templates.remove(index))
    }

    /// Add a content to one of this type's templates
    pub fn add_content(
        &mut self,
        template_id: Uuid,
        draft: BodyContentDraft,
    ) -> TemplateResult<&EmailBodyContent> {
        let accepted = &self.accepted_tags;
        let template = Self::find_template_mut(&mut self.templates, template_id)?;
        template.add_content(draft, accepted)
    }

    /// Replace or add a content using the current accepted tags
    pub fn upsert_content(
        &mut self,
        template_id: Uuid,
        draft: BodyContentDraft,
    ) -> TemplateResult<&EmailBodyContent> {
        let accepted = &self.accepted_tags;
        let template = Self::find_template_mut(&mut self.templates, template_id)?;
        template.upsert_content(draft, accepted)
    }

    /// Remove a culture's content from one of this type's templates
    pub fn remove_content(
        &mut self,
        template_id: Uuid,
        culture_code: &str,
    ) -> TemplateResult<EmailBodyContent> {
        Self::find_template_mut(&mut self.templates, template_id)?.remove_content(culture_code)
    }

    fn find_template_mut(
        templates: &mut [EmailTemplate],
        id: Uuid,
    ) -> TemplateResult<&mut EmailTemplate> {
        templates
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| TemplateError::NotFound(format!("template {}", id)))
    }

    /// Swap in a new accepted set, reconciling every template first so a
    /// failure leaves the aggregate untouched
    fn replace_accepted_tags(&mut self, accepted: Vec<MergeTag>) -> TemplateResult<()> {
        let mut templates = self.templates.clone();
        for template in &mut templates {
            template.reconcile_merge_tags(&accepted)?;
        }

        self.accepted_tags = accepted;
        self.templates = templates;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merge_tag::TagType;

    fn draft(culture: &str) -> BodyContentDraft {
        BodyContentDraft::new(
            culture,
            "Hello {{name}}",
            "<p>Hello {{name}}</p>",
            r#"{"text":"Hello {{name}}"}"#,
        )
    }

    fn defaults(template: &EmailTemplate) -> Vec<&str> {
        template
            .contents()
            .iter()
            .filter(|c| c.is_default())
            .map(|c| c.culture_code())
            .collect()
    }

    fn template_type() -> TemplateType {
        TemplateType::with_merge_tags(
            "Welcome",
            [MergeTag::new("name", TagType::String).unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn test_first_content_is_forced_default() {
        let template = EmailTemplate::new(Uuid::new_v4(), "Welcome", draft("en-US"), &[]).unwrap();
        assert_eq!(defaults(&template), vec!["en-US"]);
    }

    #[test]
    fn test_new_default_flips_previous() {
        let mut template =
            EmailTemplate::new(Uuid::new_v4(), "Welcome", draft("en-US"), &[]).unwrap();
        template
            .add_content(draft("it-IT").as_default(), &[])
            .unwrap();

        assert!(!template.content("en-US").unwrap().is_default());
        assert!(template.content("it-IT").unwrap().is_default());
        assert_eq!(defaults(&template), vec!["it-IT"]);
    }

    #[test]
    fn test_non_default_add_keeps_default() {
        let mut template =
            EmailTemplate::new(Uuid::new_v4(), "Welcome", draft("en-US"), &[]).unwrap();
        template.add_content(draft("fr-FR"), &[]).unwrap();
        assert_eq!(defaults(&template), vec!["en-US"]);
    }

    #[test]
    fn test_add_duplicate_culture() {
        let mut template =
            EmailTemplate::new(Uuid::new_v4(), "Welcome", draft("en-US"), &[]).unwrap();
        assert!(matches!(
            template.add_content(draft("en-US"), &[]),
            Err(TemplateError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_upsert_preserves_identity() {
        let mut template_type = template_type();
        let template_id = template_type
            .add_template("Welcome", draft("en-US"))
            .unwrap()
            .id();
        let content_id = template_type.template(template_id).unwrap().contents()[0].id();

        let update = BodyContentDraft::new("en-US", "Updated", "<p>Plain</p>", r#"{"text":"Plain"}"#);
        let content = template_type.upsert_content(template_id, update).unwrap();

        assert_eq!(content.id(), content_id);
        assert_eq!(content.subject(), "Updated");
        assert!(content.merge_tags().is_empty());
        assert!(content.is_default());
    }

    #[test]
    fn test_upsert_adds_missing_culture() {
        let mut template_type = template_type();
        let template_id = template_type
            .add_template("Welcome", draft("en-US"))
            .unwrap()
            .id();

        template_type
            .upsert_content(template_id, draft("de-DE").as_default())
            .unwrap();

        let template = template_type.template(template_id).unwrap();
        assert_eq!(template.cultures().collect::<Vec<_>>(), vec!["en-US", "de-DE"]);
        assert_eq!(defaults(template), vec!["de-DE"]);
    }

    #[test]
    fn test_failed_upsert_leaves_template_untouched() {
        let mut template_type = template_type();
        let template_id = template_type
            .add_template("Welcome", draft("en-US"))
            .unwrap()
            .id();
        template_type
            .add_content(template_id, draft("it-IT"))
            .unwrap();
        let before = template_type.template(template_id).unwrap().clone();

        let broken = BodyContentDraft::new("it-IT", "Ciao", "<p>Ciao</p>", "{broken").as_default();
        assert!(template_type.upsert_content(template_id, broken).is_err());
        assert_eq!(template_type.template(template_id).unwrap(), &before);
    }

    #[test]
    fn test_content_lookup_has_no_fallback() {
        let template = EmailTemplate::new(Uuid::new_v4(), "Welcome", draft("en-US"), &[]).unwrap();
        assert!(matches!(
            template.content("it-IT"),
            Err(TemplateError::NotFound(_))
        ));
        assert_eq!(template.default_content().unwrap().culture_code(), "en-US");
    }

    #[test]
    fn test_remove_content_guards_default() {
        let mut template =
            EmailTemplate::new(Uuid::new_v4(), "Welcome", draft("en-US"), &[]).unwrap();
        template.add_content(draft("it-IT"), &[]).unwrap();

        assert!(matches!(
            template.remove_content("en-US"),
            Err(TemplateError::DefaultContentRequired(_))
        ));

        template.remove_content("it-IT").unwrap();
        template.remove_content("en-US").unwrap();
        assert!(template.contents().is_empty());
    }

    #[test]
    fn test_declare_duplicate_tag() {
        let mut template_type = template_type();
        assert!(matches!(
            template_type.declare_merge_tag(MergeTag::new("name", TagType::Bool).unwrap()),
            Err(TemplateError::DuplicateMergeTag(_))
        ));
    }

    #[test]
    fn test_declare_rejects_name_outside_identifier_form() {
        let mut template_type = template_type();
        for name in ["First Name", "Total", "due-date"] {
            assert!(matches!(
                template_type.declare_merge_tag(MergeTag::new(name, TagType::String).unwrap()),
                Err(TemplateError::InvalidTemplate(_))
            ));
        }
        assert_eq!(template_type.accepted_tags().len(), 1);

        assert!(TemplateType::with_merge_tags(
            "Invoice",
            [MergeTag::new("Invoice Total", TagType::Double).unwrap()],
        )
        .is_err());
    }

    #[test]
    fn test_declare_and_retract_reconcile_contents() {
        let mut template_type = TemplateType::new("Welcome").unwrap();
        let template_id = template_type
            .add_template("Welcome", draft("en-US"))
            .unwrap()
            .id();
        let merge_tags = |tt: &TemplateType| {
            tt.template(template_id).unwrap().contents()[0]
                .merge_tags()
                .len()
        };
        assert_eq!(merge_tags(&template_type), 0);

        template_type
            .declare_merge_tag(MergeTag::new("name", TagType::String).unwrap())
            .unwrap();
        assert_eq!(merge_tags(&template_type), 1);

        template_type.retract_merge_tag("name").unwrap();
        assert_eq!(merge_tags(&template_type), 0);
        assert!(template_type.accepted_tags().is_empty());
    }

    #[test]
    fn test_from_parts_normalizes_default() {
        let first = EmailBodyContent::new(draft("en-US").as_default(), &[]).unwrap();
        let second = EmailBodyContent::new(draft("it-IT").as_default(), &[]).unwrap();
        let now = Utc::now();

        let template = EmailTemplate::from_parts(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Welcome".to_string(),
            vec![first, second],
            now,
            now,
        );
        assert_eq!(defaults(&template), vec!["en-US"]);
    }
}
