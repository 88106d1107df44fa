//! Template repository trait and in-memory storage

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::template::{DataOwner, TemplateType};

use super::record::TemplateTypeRecord;
use super::{PersistenceError, PersistenceResult};

/// Load/save boundary for template aggregates.
///
/// Aggregates are loaded as owned values and only become visible to other
/// callers once saved.
pub trait TemplateRepository: Send + Sync {
    fn get_template_type(&self, id: Uuid) -> PersistenceResult<TemplateType>;

    fn save_template_type(&self, template_type: &TemplateType) -> PersistenceResult<()>;

    fn delete_template_type(&self, id: Uuid) -> PersistenceResult<()>;

    fn list_template_types(&self) -> PersistenceResult<Vec<TemplateType>>;

    fn get_data_owner(&self, id: Uuid) -> PersistenceResult<DataOwner>;

    fn save_data_owner(&self, owner: &DataOwner) -> PersistenceResult<()>;
}

/// In-memory repository keeping template types in their storage shape
pub struct InMemoryTemplateRepository {
    template_types: DashMap<Uuid, TemplateTypeRecord>,
    data_owners: DashMap<Uuid, DataOwner>,
}

impl Default for InMemoryTemplateRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTemplateRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self {
            template_types: DashMap::new(),
            data_owners: DashMap::new(),
        }
    }

    /// Number of stored template types
    pub fn template_type_count(&self) -> usize {
        self.template_types.len()
    }
}

impl TemplateRepository for InMemoryTemplateRepository {
    fn get_template_type(&self, id: Uuid) -> PersistenceResult<TemplateType> {
        let record = self
            .template_types
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| PersistenceError::NotFound(format!("template type {}", id)))?;
        record.into_template_type()
    }

    fn save_template_type(&self, template_type: &TemplateType) -> PersistenceResult<()> {
        let record = TemplateTypeRecord::from_template_type(template_type)?;
        self.template_types.insert(template_type.id(), record);
        tracing::debug!(template_type_id = %template_type.id(), "Template type saved");
        Ok(())
    }

    fn delete_template_type(&self, id: Uuid) -> PersistenceResult<()> {
        self.template_types
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PersistenceError::NotFound(format!("template type {}", id)))
    }

    fn list_template_types(&self) -> PersistenceResult<Vec<TemplateType>> {
        self.template_types
            .iter()
            .map(|entry| entry.value().clone().into_template_type())
            .collect()
    }

    fn get_data_owner(&self, id: Uuid) -> PersistenceResult<DataOwner> {
        self.data_owners
            .get(&id)
            .map(|o| o.clone())
            .ok_or_else(|| PersistenceError::NotFound(format!("data owner {}", id)))
    }

    fn save_data_owner(&self, owner: &DataOwner) -> PersistenceResult<()> {
        self.data_owners.insert(owner.id(), owner.clone());
        Ok(())
    }
}

/// Create a shared in-memory repository
pub fn create_repository() -> Arc<InMemoryTemplateRepository> {
    Arc::new(InMemoryTemplateRepository::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merge_tag::{MergeTag, TagType};
    use crate::domain::template::BodyContentDraft;

    fn template_type() -> TemplateType {
        let mut template_type = TemplateType::with_merge_tags(
            "Invoices",
            [MergeTag::new("total", TagType::Double).unwrap()],
        )
        .unwrap();
        template_type
            .add_template(
                "Invoice",
                BodyContentDraft::new("en-US", "Invoice", "<p>{{total}}</p>", r#"{"t":"{{total}}"}"#),
            )
            .unwrap();
        template_type
    }

    #[test]
    fn test_save_and_load() {
        let repo = InMemoryTemplateRepository::new();
        let template_type = template_type();

        repo.save_template_type(&template_type).unwrap();
        assert_eq!(repo.template_type_count(), 1);
        assert_eq!(repo.get_template_type(template_type.id()).unwrap(), template_type);
    }

    #[test]
    fn test_unsaved_changes_are_invisible() {
        let repo = InMemoryTemplateRepository::new();
        let template_type = template_type();
        repo.save_template_type(&template_type).unwrap();

        let mut loaded = repo.get_template_type(template_type.id()).unwrap();
        loaded
            .declare_merge_tag(MergeTag::new("due", TagType::DateOnly).unwrap())
            .unwrap();

        let stored = repo.get_template_type(template_type.id()).unwrap();
        assert_eq!(stored.accepted_tags().len(), 1);
    }

    #[test]
    fn test_delete_and_missing() {
        let repo = create_repository();
        let template_type = template_type();
        repo.save_template_type(&template_type).unwrap();

        repo.delete_template_type(template_type.id()).unwrap();
        assert!(matches!(
            repo.get_template_type(template_type.id()),
            Err(PersistenceError::NotFound(_))
        ));
        assert!(repo.delete_template_type(template_type.id()).is_err());
        assert!(repo.list_template_types().unwrap().is_empty());
    }

    #[test]
    fn test_data_owner_round_trip() {
        let repo = InMemoryTemplateRepository::new();
        let owner = DataOwner::new("Acme").unwrap();
        repo.save_data_owner(&owner).unwrap();
        assert_eq!(repo.get_data_owner(owner.id()).unwrap(), owner);
        assert!(repo.get_data_owner(Uuid::new_v4()).is_err());
    }
}
