//! Data owners and their custom merge data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::merge_tag::CustomMergeTag;

use super::types::{validate_name, TemplateError, TemplateResult};

/// An entity (account, tenant) owning custom merge data merged into every
/// email rendered on its behalf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataOwner {
    id: Uuid,
    name: String,
    #[serde(default)]
    custom_data: Vec<CustomMergeTag>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DataOwner {
    pub fn new(name: &str) -> TemplateResult<Self> {
        validate_name(name)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            custom_data: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn custom_data(&self) -> &[CustomMergeTag] {
        &self.custom_data
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Look up a custom value by tag name
    pub fn custom_value(&self, name: &str) -> Option<&CustomMergeTag> {
        self.custom_data.iter().find(|c| c.name() == name)
    }

    /// Set a custom value, replacing any value with the same name
    pub fn set_custom_data(&mut self, data: CustomMergeTag) {
        match self.custom_data.iter_mut().find(|c| c.name() == data.name()) {
            Some(existing) => *existing = data,
            None => self.custom_data.push(data),
        }
        self.updated_at = Utc::now();
    }

    pub fn remove_custom_data(&mut self, name: &str) -> TemplateResult<CustomMergeTag> {
        let index = self
            .custom_data
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| {
                TemplateError::NotFound(format!("custom data '{}' of owner {}", name, self.id))
            })?;
        self.updated_at = Utc::now();
        Ok(self.custom_data.remove(index))
    }
}
