use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use ara_email_templates::config::Settings;
use ara_email_templates::merge::RenderRequest;
use ara_email_templates::merge_tag::{CustomMergeTag, MergeTag, TagType};
use ara_email_templates::persistence::InMemoryTemplateRepository;
use ara_email_templates::service::TemplateService;
use ara_email_templates::telemetry::init_telemetry;
use ara_email_templates::template::BodyContentDraft;

/// Render fixture read from the first command line argument
#[derive(Debug, Deserialize)]
struct Fixture {
    template_type: String,
    #[serde(default)]
    merge_tags: Vec<FixtureTag>,
    template: String,
    contents: Vec<BodyContentDraft>,
    culture: Option<String>,
    #[serde(default)]
    owner_data: Vec<FixtureValue>,
    #[serde(default)]
    request: RenderRequest,
}

#[derive(Debug, Deserialize)]
struct FixtureTag {
    name: String,
    type_name: TagType,
}

#[derive(Debug, Deserialize)]
struct FixtureValue {
    name: String,
    /// Inferred from the value when omitted
    type_name: Option<TagType>,
    value: String,
}

fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;
    init_telemetry(&settings.telemetry)?;
    tracing::info!("Configuration loaded");

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: ara-email-templates <fixture.json>");
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read fixture: {}", path))?;
    let fixture: Fixture =
        serde_json::from_str(&raw).with_context(|| format!("Invalid fixture: {}", path))?;

    let service = TemplateService::new(Arc::new(InMemoryTemplateRepository::new()), &settings);

    let tags = fixture
        .merge_tags
        .iter()
        .map(|t| MergeTag::new(&t.name, t.type_name))
        .collect::<Result<Vec<_>, _>>()?;
    let template_type = service.create_template_type(&fixture.template_type, tags)?;

    let mut contents = fixture.contents.into_iter();
    let Some(initial) = contents.next() else {
        bail!("Fixture has no contents");
    };
    let template = service.create_template(template_type.id(), &fixture.template, initial)?;
    for draft in contents {
        service.upsert_content(template_type.id(), template.id(), draft)?;
    }

    let owner_id = if fixture.owner_data.is_empty() {
        None
    } else {
        let owner = service.create_data_owner(&fixture.template_type)?;
        for data in &fixture.owner_data {
            let custom = match data.type_name {
                Some(tag_type) => CustomMergeTag::from_string(&data.name, tag_type, &data.value)?,
                None => CustomMergeTag::infer(&data.name, &data.value)?,
            };
            service.set_owner_data(owner.id(), custom)?;
        }
        Some(owner.id())
    };

    let culture = fixture
        .culture
        .unwrap_or_else(|| settings.templates.default_culture.clone());
    let email = service.render(
        template_type.id(),
        template.id(),
        &culture,
        owner_id,
        &fixture.request,
    )?;

    println!("{}", serde_json::to_string_pretty(&email)?);
    Ok(())
}
