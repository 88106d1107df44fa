//! Application service over the template aggregates.
//!
//! Every mutation loads the aggregate, changes it and saves it back; a
//! failure before the save leaves the stored aggregate as it was.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::config::{Settings, TemplatesConfig};
use crate::domain::merge::{MergeEngine, MergeOptions, RenderRequest, RenderedEmail};
use crate::domain::merge_tag::{CustomMergeTag, MergeTag};
use crate::domain::template::{
    BodyContentDraft, DataOwner, EmailBodyContent, EmailTemplate, TemplateError, TemplateType,
};
use crate::error::{AppError, Result};
use crate::metrics::{ContentMetrics, RenderMetrics};
use crate::persistence::TemplateRepository;

/// Template management and rendering entry point
pub struct TemplateService {
    repository: Arc<dyn TemplateRepository>,
    engine: MergeEngine,
    config: TemplatesConfig,
}

impl TemplateService {
    pub fn new(repository: Arc<dyn TemplateRepository>, settings: &Settings) -> Self {
        let engine = MergeEngine::new(MergeOptions::from(&settings.merge));
        Self::with_engine(repository, engine, settings.templates.clone())
    }

    pub fn with_engine(
        repository: Arc<dyn TemplateRepository>,
        engine: MergeEngine,
        config: TemplatesConfig,
    ) -> Self {
        Self {
            repository,
            engine,
            config,
        }
    }

    pub fn engine(&self) -> &MergeEngine {
        &self.engine
    }

    /// Create and store a template type accepting `tags`
    pub fn create_template_type(&self, name: &str, tags: Vec<MergeTag>) -> Result<TemplateType> {
        let template_type = TemplateType::with_merge_tags(name, tags)?;
        self.repository.save_template_type(&template_type)?;

        tracing::info!(
            template_type_id = %template_type.id(),
            name = %template_type.name(),
            merge_tags = template_type.accepted_tags().len(),
            "Template type created"
        );
        Ok(template_type)
    }

    pub fn template_type(&self, id: Uuid) -> Result<TemplateType> {
        Ok(self.repository.get_template_type(id)?)
    }

    /// Accept a new merge tag on an existing type
    pub fn declare_merge_tag(&self, template_type_id: Uuid, tag: MergeTag) -> Result<TemplateType> {
        let mut template_type = self.repository.get_template_type(template_type_id)?;
        let name = tag.name().to_string();
        template_type.declare_merge_tag(tag)?;
        self.repository.save_template_type(&template_type)?;

        tracing::info!(template_type_id = %template_type_id, tag = %name, "Merge tag declared");
        Ok(template_type)
    }

    /// Stop accepting a merge tag
    pub fn retract_merge_tag(&self, template_type_id: Uuid, name: &str) -> Result<TemplateType> {
        let mut template_type = self.repository.get_template_type(template_type_id)?;
        template_type.retract_merge_tag(name)?;
        self.repository.save_template_type(&template_type)?;

        tracing::info!(template_type_id = %template_type_id, tag = %name, "Merge tag retracted");
        Ok(template_type)
    }

    /// Create a template with its initial (default) content
    pub fn create_template(
        &self,
        template_type_id: Uuid,
        name: &str,
        initial: BodyContentDraft,
    ) -> Result<EmailTemplate> {
        self.check_subject(&initial)?;
        let mut template_type = self.repository.get_template_type(template_type_id)?;
        let template = self.track_content(template_type.add_template(name, initial))?.clone();
        self.repository.save_template_type(&template_type)?;
        Ok(template)
    }

    pub fn template(&self, template_type_id: Uuid, template_id: Uuid) -> Result<EmailTemplate> {
        let template_type = self.repository.get_template_type(template_type_id)?;
        Ok(template_type.template(template_id)?.clone())
    }

    /// Replace a culture's content in place, or add it if missing
    pub fn upsert_content(
        &self,
        template_type_id: Uuid,
        template_id: Uuid,
        draft: BodyContentDraft,
    ) -> Result<EmailBodyContent> {
        if let Err(e) = self.check_subject(&draft) {
            ContentMetrics::record_rejected();
            return Err(e);
        }

        let mut template_type = self.repository.get_template_type(template_type_id)?;
        let culture = draft.culture_code.clone();
        let content = self
            .track_content(template_type.upsert_content(template_id, draft))?
            .clone();
        self.repository.save_template_type(&template_type)?;
        ContentMetrics::record_upserted();

        tracing::info!(
            template_id = %template_id,
            culture = %culture,
            merge_tags = content.merge_tags().len(),
            is_default = content.is_default(),
            "Body content saved"
        );
        Ok(content)
    }

    /// Remove a culture's content
    pub fn remove_content(
        &self,
        template_type_id: Uuid,
        template_id: Uuid,
        culture_code: &str,
    ) -> Result<EmailBodyContent> {
        let mut template_type = self.repository.get_template_type(template_type_id)?;
        let removed = template_type.remove_content(template_id, culture_code)?;
        self.repository.save_template_type(&template_type)?;
        Ok(removed)
    }

    /// Content for an exact culture; no fallback to the default content
    pub fn get_content(
        &self,
        template_type_id: Uuid,
        template_id: Uuid,
        culture_code: &str,
    ) -> Result<EmailBodyContent> {
        let template_type = self.repository.get_template_type(template_type_id)?;
        let template = template_type.template(template_id)?;
        Ok(template.content(culture_code)?.clone())
    }

    pub fn create_data_owner(&self, name: &str) -> Result<DataOwner> {
        let owner = DataOwner::new(name)?;
        self.repository.save_data_owner(&owner)?;
        tracing::info!(owner_id = %owner.id(), name = %owner.name(), "Data owner created");
        Ok(owner)
    }

    /// Set (or replace) one custom value on a data owner
    pub fn set_owner_data(&self, owner_id: Uuid, data: CustomMergeTag) -> Result<DataOwner> {
        let mut owner = self.repository.get_data_owner(owner_id)?;
        tracing::debug!(owner_id = %owner_id, tag = %data.name(), "Custom data set");
        owner.set_custom_data(data);
        self.repository.save_data_owner(&owner)?;
        Ok(owner)
    }

    /// Render a template's content for one culture, merging the owner's
    /// custom data when an owner is given
    pub fn render(
        &self,
        template_type_id: Uuid,
        template_id: Uuid,
        culture_code: &str,
        owner_id: Option<Uuid>,
        request: &RenderRequest,
    ) -> Result<RenderedEmail> {
        let started = Instant::now();
        let result = self.render_inner(template_type_id, template_id, culture_code, owner_id, request);

        match &result {
            Ok(email) => {
                RenderMetrics::record_rendered(
                    email.linked_resources.len(),
                    started.elapsed().as_secs_f64(),
                );
                tracing::info!(
                    template_id = %template_id,
                    culture = %culture_code,
                    resources = email.linked_resources.len(),
                    "Email rendered"
                );
            }
            Err(e) => {
                RenderMetrics::record_failed(e.code());
                tracing::warn!(
                    template_id = %template_id,
                    culture = %culture_code,
                    error = %e,
                    "Email render failed"
                );
            }
        }

        result
    }

    fn render_inner(
        &self,
        template_type_id: Uuid,
        template_id: Uuid,
        culture_code: &str,
        owner_id: Option<Uuid>,
        request: &RenderRequest,
    ) -> Result<RenderedEmail> {
        let template_type = self.repository.get_template_type(template_type_id)?;
        let content = template_type.template(template_id)?.content(culture_code)?;

        let owner = owner_id
            .map(|id| self.repository.get_data_owner(id))
            .transpose()?;
        let custom_data = owner.as_ref().map(|o| o.custom_data()).unwrap_or_default();

        Ok(content.render(&self.engine, request, custom_data)?)
    }

    fn check_subject(&self, draft: &BodyContentDraft) -> Result<()> {
        let length = draft.subject.chars().count();
        if length > self.config.max_subject_length {
            return Err(AppError::Validation(format!(
                "Subject is {} characters, the limit is {}",
                length, self.config.max_subject_length
            )));
        }
        Ok(())
    }

    fn track_content<T>(&self, result: std::result::Result<T, TemplateError>) -> Result<T> {
        result.map_err(|e| {
            if matches!(e, TemplateError::Extraction(_)) {
                ContentMetrics::record_extraction_failed();
            }
            ContentMetrics::record_rejected();
            AppError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merge_tag::TagType;
    use crate::persistence::InMemoryTemplateRepository;
    use std::collections::HashMap;

    fn service() -> TemplateService {
        TemplateService::new(Arc::new(InMemoryTemplateRepository::new()), &Settings::default())
    }

    fn draft(culture: &str) -> BodyContentDraft {
        BodyContentDraft::new(
            culture,
            "Hi {{name}}",
            "<p>Hi {{name}}</p>",
            r#"{"text":"Hi {{name}}"}"#,
        )
    }

    #[test]
    fn test_create_and_render() {
        let service = service();
        let tt = service
            .create_template_type("Welcome", vec![MergeTag::new("name", TagType::String).unwrap()])
            .unwrap();
        let template = service.create_template(tt.id(), "Welcome", draft("en-US")).unwrap();

        let request = RenderRequest {
            arguments: HashMap::from([("name".to_string(), "Ada".to_string())]),
            resources: vec![],
        };
        let email = service
            .render(tt.id(), template.id(), "en-US", None, &request)
            .unwrap();
        assert_eq!(email.subject, "Hi Ada");
        assert_eq!(email.html, "<p>Hi Ada</p>");
    }

    #[test]
    fn test_subject_limit() {
        let repository = Arc::new(InMemoryTemplateRepository::new());
        let mut settings = Settings::default();
        settings.templates.max_subject_length = 5;
        let service = TemplateService::new(repository, &settings);

        let tt = service.create_template_type("Welcome", vec![]).unwrap();
        let err = service
            .create_template(tt.id(), "Welcome", draft("en-US"))
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_failed_upsert_is_not_saved() {
        let service = service();
        let tt = service.create_template_type("Welcome", vec![]).unwrap();
        let template = service.create_template(tt.id(), "Welcome", draft("en-US")).unwrap();

        let broken = BodyContentDraft::new("en-US", "Changed", "<p>x</p>", "{oops");
        assert!(service.upsert_content(tt.id(), template.id(), broken).is_err());

        let stored = service.get_content(tt.id(), template.id(), "en-US").unwrap();
        assert_eq!(stored.subject(), "Hi {{name}}");
    }

    #[test]
    fn test_missing_culture_and_owner() {
        let service = service();
        let tt = service.create_template_type("Welcome", vec![]).unwrap();
        let template = service.create_template(tt.id(), "Welcome", draft("en-US")).unwrap();

        let err = service.get_content(tt.id(), template.id(), "it-IT").unwrap_err();
        assert!(err.is_not_found());

        let err = service
            .render(tt.id(), template.id(), "en-US", Some(Uuid::new_v4()), &RenderRequest::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
