//! Entry CRUD on top of the authorization engine. The acting user is always
//! stamped as author on creation; moderative edits and deletions of foreign
//! entries are audited.

use crate::authz;
use crate::images::ImageService;
use crate::listing::{self, EntryFilter};
use bb_core::error::{AppError, Result};
use bb_core::models::{Actor, Entry};
use bb_core::privilege::PrivilegeSet;
use bb_core::traits::{AuditLog, BillboardRepo};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Fields of an entry as submitted by the actor. Used for both create and
/// edit; the author never travels with the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryDraft {
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    /// Authors may hide their entry right away.
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

pub struct EntryService {
    repo: Arc<dyn BillboardRepo>,
    images: Arc<ImageService>,
    audit: Arc<dyn AuditLog>,
}

impl EntryService {
    pub fn new(
        repo: Arc<dyn BillboardRepo>,
        images: Arc<ImageService>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            repo,
            images,
            audit,
        }
    }

    /// Creates a new entry owned by the acting user.
    pub async fn create(
        &self,
        draft: EntryDraft,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<Entry> {
        if !authz::can_add(Some(actor), privileges) {
            return Err(AppError::PermissionDenied(
                "you are not allowed to add entries".into(),
            ));
        }

        if self.repo.count_categories().await? == 0 {
            return Err(AppError::InvalidState(
                "cannot add an entry while no category exists".into(),
            ));
        }

        self.validate(&draft).await?;

        let now = chrono::Utc::now();
        let entry = Entry {
            id: Uuid::now_v7(),
            title: draft.title,
            description: draft.description,
            category_id: draft.category_id,
            author: Some(actor.account.clone()),
            visible: draft.visible,
            closed: false,
            created_at: now,
            updated_at: now,
        };
        self.repo.create_entry(entry.clone()).await?;

        Ok(entry)
    }

    /// Applies a content edit. Touches `updated_at`; a moderative edit of a
    /// foreign entry writes an audit line, with a distinct variant when the
    /// entry was renamed.
    pub async fn update(
        &self,
        id: Uuid,
        draft: EntryDraft,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<Entry> {
        let mut entry = self
            .repo
            .get_entry(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry", id.to_string()))?;

        let has_categories = self.repo.count_categories().await? > 0;
        if !authz::can_edit(Some(&entry), Some(actor), privileges, has_categories) {
            return Err(AppError::PermissionDenied(
                "you are not allowed to edit this entry".into(),
            ));
        }

        self.validate(&draft).await?;

        let previous_title = entry.title.clone();
        entry.title = draft.title;
        entry.description = draft.description;
        entry.category_id = draft.category_id;
        entry.visible = draft.visible;
        entry.updated_at = chrono::Utc::now();
        self.repo.update_entry_content(&entry).await?;

        if privileges.is_moderator() && !entry.authored_by(actor) {
            if entry.title != previous_title {
                self.audit.log(&format!(
                    "Moderative edit of entry \"{}\" by {}, renamed to \"{}\"",
                    previous_title,
                    entry.author_display(),
                    entry.title
                ));
            } else {
                self.audit.log(&format!(
                    "Moderative edit of entry \"{}\" by {}",
                    entry.title,
                    entry.author_display()
                ));
            }
        }

        Ok(entry)
    }

    /// Deletes an entry, its backing image files and, through the
    /// repository cascade, its comments and image records.
    pub async fn delete(&self, id: Uuid, actor: &Actor, privileges: &PrivilegeSet) -> Result<()> {
        let entry = self
            .repo
            .get_entry(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry", id.to_string()))?;

        let has_categories = self.repo.count_categories().await? > 0;
        if !authz::can_delete(Some(&entry), Some(actor), privileges, has_categories) {
            return Err(AppError::PermissionDenied(
                "you are not allowed to delete this entry".into(),
            ));
        }

        // files first, then the row-level cascade
        self.images.delete_files_for_entry(id).await?;
        self.repo.delete_entry(id).await?;

        if privileges.is_moderator() && !entry.authored_by(actor) {
            self.audit.log(&format!(
                "Moderative deletion of entry \"{}\" by {}",
                entry.title,
                entry.author_display()
            ));
        }

        Ok(())
    }

    /// Fetches one entry, enforcing the view rule.
    pub async fn show(
        &self,
        id: Uuid,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<Entry> {
        let entry = self
            .repo
            .get_entry(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry", id.to_string()))?;

        if !authz::can_view(Some(&entry), Some(actor), privileges) {
            return Err(AppError::PermissionDenied(
                "you are not allowed to view this entry".into(),
            ));
        }

        Ok(entry)
    }

    /// Lists entries through a named filter preset, optionally narrowed to
    /// a category and a search term.
    pub async fn list(
        &self,
        filter: EntryFilter,
        category: Option<Uuid>,
        search: Option<&str>,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<Vec<Entry>> {
        if !filter.available_to(privileges) {
            return Err(AppError::PermissionDenied(
                "this filter is available to moderators only".into(),
            ));
        }

        let entries = self.repo.list_entries().await?;
        Ok(listing::select_entries(
            entries, filter, category, search, actor,
        ))
    }

    async fn validate(&self, draft: &EntryDraft) -> Result<()> {
        if draft.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be blank".into()));
        }
        if draft.description.trim().is_empty() {
            return Err(AppError::Validation("description must not be blank".into()));
        }
        if self.repo.get_category(draft.category_id).await?.is_none() {
            return Err(AppError::NotFound(
                "Category",
                draft.category_id.to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb_core::models::{Category, EntryComment, EntryImage};
    use bb_core::privilege::Privilege;
    use bb_core::FileStore;
    use bb_core::testing::{InMemoryFileStore, InMemoryRepo, RecordingAuditLog};

    struct Fixture {
        repo: Arc<InMemoryRepo>,
        store: Arc<InMemoryFileStore>,
        audit: Arc<RecordingAuditLog>,
        service: EntryService,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryRepo::new());
        let store = Arc::new(InMemoryFileStore::new());
        let audit = Arc::new(RecordingAuditLog::new());
        let images = Arc::new(ImageService::new(repo.clone(), store.clone(), audit.clone()));
        let service = EntryService::new(repo.clone(), images, audit.clone());
        Fixture {
            repo,
            store,
            audit,
            service,
        }
    }

    async fn seed_category(repo: &InMemoryRepo) -> Category {
        let category = Category {
            id: Uuid::now_v7(),
            title: "For sale".to_string(),
            description: "Things to sell".to_string(),
            created_at: chrono::Utc::now(),
        };
        repo.create_category(category.clone()).await.unwrap();
        category
    }

    fn draft(category_id: Uuid) -> EntryDraft {
        EntryDraft {
            title: "Guitar".to_string(),
            description: "Offering my electric guitar.".to_string(),
            category_id,
            visible: true,
        }
    }

    fn creator() -> PrivilegeSet {
        PrivilegeSet::NONE.with(Privilege::Create)
    }

    fn moderator() -> PrivilegeSet {
        PrivilegeSet::NONE.with(Privilege::Moderate)
    }

    #[tokio::test]
    async fn create_stamps_the_acting_user_as_author() {
        let f = fixture();
        let category = seed_category(&f.repo).await;
        let alice = Actor::new("alice", "Alice");

        let entry = f
            .service
            .create(draft(category.id), &alice, &creator())
            .await
            .unwrap();
        assert_eq!(entry.author.as_deref(), Some("alice"));
        assert!(!entry.closed);
    }

    #[tokio::test]
    async fn create_without_categories_is_an_invalid_state() {
        let f = fixture();
        let alice = Actor::new("alice", "Alice");

        let err = f
            .service
            .create(draft(Uuid::now_v7()), &alice, &creator())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn create_requires_the_create_privilege() {
        let f = fixture();
        let category = seed_category(&f.repo).await;
        let alice = Actor::new("alice", "Alice");

        let err = f
            .service
            .create(
                draft(category.id),
                &alice,
                &PrivilegeSet::NONE.with(Privilege::View),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn blank_title_fails_validation() {
        let f = fixture();
        let category = seed_category(&f.repo).await;
        let alice = Actor::new("alice", "Alice");

        let mut d = draft(category.id);
        d.title = "   ".to_string();
        let err = f.service.create(d, &alice, &creator()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_touches_updated_at_and_audits_moderative_renames() {
        let f = fixture();
        let category = seed_category(&f.repo).await;
        let alice = Actor::new("alice", "Alice");
        let bob = Actor::new("bob", "Bob");

        let entry = f
            .service
            .create(draft(category.id), &alice, &creator())
            .await
            .unwrap();

        let mut renamed = draft(category.id);
        renamed.title = "Bass guitar".to_string();
        let updated = f
            .service
            .update(entry.id, renamed, &bob, &moderator())
            .await
            .unwrap();

        assert!(updated.updated_at > entry.updated_at);
        let lines = f.audit.entries();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("renamed to \"Bass guitar\""));
    }

    #[tokio::test]
    async fn moderative_edit_without_rename_uses_the_plain_line() {
        let f = fixture();
        let category = seed_category(&f.repo).await;
        let alice = Actor::new("alice", "Alice");
        let bob = Actor::new("bob", "Bob");

        let entry = f
            .service
            .create(draft(category.id), &alice, &creator())
            .await
            .unwrap();

        let mut edited = draft(category.id);
        edited.description = "Offering my acoustic guitar.".to_string();
        f.service
            .update(entry.id, edited, &bob, &moderator())
            .await
            .unwrap();

        let lines = f.audit.entries();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Moderative edit of entry \"Guitar\""));
        assert!(!lines[0].contains("renamed"));
    }

    #[tokio::test]
    async fn own_edits_are_not_audited() {
        let f = fixture();
        let category = seed_category(&f.repo).await;
        let alice = Actor::new("alice", "Alice");

        let entry = f
            .service
            .create(draft(category.id), &alice, &creator())
            .await
            .unwrap();
        f.service
            .update(entry.id, draft(category.id), &alice, &creator())
            .await
            .unwrap();
        assert!(f.audit.entries().is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_and_removes_backing_files() {
        let f = fixture();
        let category = seed_category(&f.repo).await;
        let alice = Actor::new("alice", "Alice");

        let entry = f
            .service
            .create(draft(category.id), &alice, &creator())
            .await
            .unwrap();

        f.repo
            .create_comment(EntryComment {
                id: Uuid::now_v7(),
                entry_id: entry.id,
                title: "Hi".to_string(),
                content: "Interested.".to_string(),
                author: Some("bob".to_string()),
                time: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let image_id = "0123456789abcdef0123456789abcdef";
        f.store.put(&format!("{image_id}.png"), b"png").await.unwrap();
        f.repo
            .create_image(EntryImage {
                id: Uuid::now_v7(),
                entry_id: entry.id,
                image_id: Some(image_id.to_string()),
                image_name: "pic.png".to_string(),
                description: None,
                author: Some("alice".to_string()),
                time: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
                legacy_data: None,
            })
            .await
            .unwrap();

        f.service.delete(entry.id, &alice, &creator()).await.unwrap();

        assert!(f.repo.get_entry(entry.id).await.unwrap().is_none());
        assert!(f.repo.list_comments(entry.id).await.unwrap().is_empty());
        assert!(f.repo.list_images(entry.id).await.unwrap().is_empty());
        assert!(f.store.file_names().is_empty());
    }

    #[tokio::test]
    async fn moderative_delete_is_audited() {
        let f = fixture();
        let category = seed_category(&f.repo).await;
        let alice = Actor::new("alice", "Alice");
        let bob = Actor::new("bob", "Bob");

        let entry = f
            .service
            .create(draft(category.id), &alice, &creator())
            .await
            .unwrap();
        f.service.delete(entry.id, &bob, &moderator()).await.unwrap();

        let lines = f.audit.entries();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Moderative deletion of entry"));
    }

    #[tokio::test]
    async fn show_denies_hidden_entries_to_strangers() {
        let f = fixture();
        let category = seed_category(&f.repo).await;
        let alice = Actor::new("alice", "Alice");
        let bob = Actor::new("bob", "Bob");

        let mut d = draft(category.id);
        d.visible = false;
        let entry = f.service.create(d, &alice, &creator()).await.unwrap();

        assert!(f.service.show(entry.id, &alice, &creator()).await.is_ok());
        let err = f.service.show(entry.id, &bob, &creator()).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }
}
