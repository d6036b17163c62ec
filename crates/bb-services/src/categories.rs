//! Category administration. Everything here is gated on the `Manage`
//! privilege; deletion is forbidden while entries still reference the
//! category, keeping the required-category constraint on entries intact.

use bb_core::error::{AppError, Result};
use bb_core::models::{Actor, Category};
use bb_core::privilege::PrivilegeSet;
use bb_core::traits::{AuditLog, BillboardRepo};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryDraft {
    pub title: String,
    pub description: String,
}

pub struct CategoryService {
    repo: Arc<dyn BillboardRepo>,
    audit: Arc<dyn AuditLog>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn BillboardRepo>, audit: Arc<dyn AuditLog>) -> Self {
        Self { repo, audit }
    }

    pub async fn create(
        &self,
        draft: CategoryDraft,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<Category> {
        require_manage(privileges)?;
        validate(&draft)?;

        let category = Category {
            id: Uuid::now_v7(),
            title: draft.title,
            description: draft.description,
            created_at: chrono::Utc::now(),
        };
        self.repo.create_category(category.clone()).await?;

        self.audit.log(&format!(
            "Category \"{}\" added by {}",
            category.title, actor.display
        ));

        Ok(category)
    }

    pub async fn update(
        &self,
        id: Uuid,
        draft: CategoryDraft,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<Category> {
        require_manage(privileges)?;
        validate(&draft)?;

        let mut category = self
            .repo
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category", id.to_string()))?;

        category.title = draft.title;
        category.description = draft.description;
        self.repo.update_category(&category).await?;

        self.audit.log(&format!(
            "Category \"{}\" edited by {}",
            category.title, actor.display
        ));

        Ok(category)
    }

    /// Deleting a category that entries still reference is forbidden;
    /// reassign or delete the entries first.
    pub async fn delete(&self, id: Uuid, actor: &Actor, privileges: &PrivilegeSet) -> Result<()> {
        require_manage(privileges)?;

        let category = self
            .repo
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category", id.to_string()))?;

        let referencing = self.repo.count_entries_in_category(id).await?;
        if referencing > 0 {
            return Err(AppError::InvalidState(format!(
                "category \"{}\" is still referenced by {} entries",
                category.title, referencing
            )));
        }

        self.repo.delete_category(id).await?;

        self.audit.log(&format!(
            "Category \"{}\" removed by {}",
            category.title, actor.display
        ));

        Ok(())
    }

    /// Anyone who may use the bill-board may see the category list; the
    /// entry form needs it.
    pub async fn list(&self, privileges: &PrivilegeSet) -> Result<Vec<Category>> {
        if !privileges.any() {
            return Err(AppError::PermissionDenied(
                "you are not allowed to use the bill-board".into(),
            ));
        }

        self.repo.list_categories().await
    }
}

fn require_manage(privileges: &PrivilegeSet) -> Result<()> {
    if !privileges.manage {
        return Err(AppError::PermissionDenied(
            "you need the manage privilege to administer categories".into(),
        ));
    }
    Ok(())
}

fn validate(draft: &CategoryDraft) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be blank".into()));
    }
    if draft.description.trim().is_empty() {
        return Err(AppError::Validation("description must not be blank".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb_core::models::Entry;
    use bb_core::privilege::Privilege;
    use bb_core::testing::{InMemoryRepo, RecordingAuditLog};

    fn service() -> (Arc<InMemoryRepo>, CategoryService) {
        let repo = Arc::new(InMemoryRepo::new());
        let service = CategoryService::new(repo.clone(), Arc::new(RecordingAuditLog::new()));
        (repo, service)
    }

    fn manager() -> PrivilegeSet {
        PrivilegeSet::NONE.with(Privilege::Manage)
    }

    fn draft() -> CategoryDraft {
        CategoryDraft {
            title: "For sale".to_string(),
            description: "Things to sell".to_string(),
        }
    }

    #[tokio::test]
    async fn crud_requires_manage() {
        let (_, service) = service();
        let alice = Actor::new("alice", "Alice");
        let moderate = PrivilegeSet::NONE.with(Privilege::Moderate);

        let err = service.create(draft(), &alice, &moderate).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert!(service.create(draft(), &alice, &manager()).await.is_ok());
    }

    #[tokio::test]
    async fn blank_fields_fail_validation() {
        let (_, service) = service();
        let alice = Actor::new("alice", "Alice");

        let bad = CategoryDraft {
            title: "Ok".to_string(),
            description: " ".to_string(),
        };
        let err = service.create(bad, &alice, &manager()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn deletion_is_forbidden_while_entries_reference_the_category() {
        let (repo, service) = service();
        let alice = Actor::new("alice", "Alice");

        let category = service.create(draft(), &alice, &manager()).await.unwrap();
        repo.create_entry(Entry {
            id: Uuid::now_v7(),
            title: "Guitar".to_string(),
            description: "For sale.".to_string(),
            category_id: category.id,
            author: Some("alice".to_string()),
            visible: true,
            closed: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

        let err = service
            .delete(category.id, &alice, &manager())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let entry_id = repo.list_entries().await.unwrap()[0].id;
        repo.delete_entry(entry_id).await.unwrap();
        assert!(service.delete(category.id, &alice, &manager()).await.is_ok());
    }
}
