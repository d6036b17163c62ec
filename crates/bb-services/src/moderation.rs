//! # Moderation Workflow
//!
//! Lock/unlock, hide/show (single and batch) and the comment flows. Each
//! entry has two independent boolean axes (visible, closed); every
//! transition re-checks permission against the acting identity.
//!
//! Visibility and lock toggles deliberately do not refresh `updated_at`:
//! that timestamp tracks content edits only.

use crate::authz;
use bb_core::error::{AppError, Result};
use bb_core::models::{Actor, Entry, EntryComment, Notification};
use bb_core::privilege::PrivilegeSet;
use bb_core::traits::{AuditLog, BillboardRepo, Notifier};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// The closed set of batch operations over a selection of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchVisibilityAction {
    Show,
    Hide,
}

impl BatchVisibilityAction {
    fn target_visibility(self) -> bool {
        matches!(self, BatchVisibilityAction::Show)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Error,
}

/// One per-item outcome of a batch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashMessage {
    pub kind: MessageKind,
    pub text: String,
}

/// Accumulated per-item outcomes. A batch always completes and returns a
/// full bag; expected failures (permission, missing row, store hiccup) are
/// messages, never errors propagated to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageBag {
    pub messages: Vec<FlashMessage>,
}

impl MessageBag {
    pub fn add_success(&mut self, text: impl Into<String>) {
        self.messages.push(FlashMessage {
            kind: MessageKind::Success,
            text: text.into(),
        });
    }

    pub fn add_error(&mut self, text: impl Into<String>) {
        self.messages.push(FlashMessage {
            kind: MessageKind::Error,
            text: text.into(),
        });
    }

    pub fn successes(&self) -> impl Iterator<Item = &FlashMessage> {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Success)
    }

    pub fn errors(&self) -> impl Iterator<Item = &FlashMessage> {
        self.messages.iter().filter(|m| m.kind == MessageKind::Error)
    }
}

/// A new comment as submitted by the actor. The author is always stamped
/// from the acting identity, never taken from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub title: String,
    pub content: String,
}

pub struct ModerationService {
    repo: Arc<dyn BillboardRepo>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditLog>,
    /// Site-wide switch for the comment feature.
    comments_enabled: bool,
}

impl ModerationService {
    pub fn new(
        repo: Arc<dyn BillboardRepo>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditLog>,
        comments_enabled: bool,
    ) -> Self {
        Self {
            repo,
            notifier,
            audit,
            comments_enabled,
        }
    }

    /// Locks an opened entry for write access. Moderators only.
    pub async fn lock(&self, id: Uuid, actor: &Actor, privileges: &PrivilegeSet) -> Result<Entry> {
        self.set_closed(id, true, actor, privileges).await
    }

    /// Opens a locked entry. Moderators only.
    pub async fn unlock(
        &self,
        id: Uuid,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<Entry> {
        self.set_closed(id, false, actor, privileges).await
    }

    async fn set_closed(
        &self,
        id: Uuid,
        closed: bool,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<Entry> {
        if !authz::is_moderator(privileges) {
            return Err(AppError::PermissionDenied(
                "only moderators may lock or unlock entries".into(),
            ));
        }

        let mut entry = self
            .repo
            .get_entry(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry", id.to_string()))?;

        self.repo.set_entry_closed(id, closed).await?;
        entry.closed = closed;

        self.notify_lock_change(&entry, actor, closed);
        if closed {
            self.audit.log(&format!(
                "Entry \"{}\" by {} locked for write access",
                entry.title,
                entry.author_display()
            ));
        } else {
            self.audit.log(&format!(
                "Entry \"{}\" by {} opened for write access",
                entry.title,
                entry.author_display()
            ));
        }

        Ok(entry)
    }

    /// Toggles the visibility of a single entry. Author or moderator.
    /// Idempotent: hiding a hidden entry is a state-wise no-op but still
    /// re-checks permission.
    pub async fn set_visibility(
        &self,
        id: Uuid,
        visible: bool,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<Entry> {
        let mut entry = self
            .repo
            .get_entry(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry", id.to_string()))?;

        if !authz::can_toggle_visibility(&entry, actor, privileges) {
            return Err(AppError::PermissionDenied(
                "only the author or a moderator may change the visibility of an entry".into(),
            ));
        }

        self.repo.set_entry_visible(id, visible).await?;
        entry.visible = visible;

        Ok(entry)
    }

    /// Applies show/hide to a selected set of entries. Each item is
    /// independent: permission is re-evaluated per entry and failures are
    /// collected as messages without aborting the rest of the batch.
    pub async fn batch(
        &self,
        action: BatchVisibilityAction,
        ids: &[Uuid],
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> MessageBag {
        let visible = action.target_visibility();
        let mut bag = MessageBag::default();

        for &id in ids {
            let entry = match self.repo.get_entry(id).await {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    bag.add_error(format!("Entry not found: {id}"));
                    continue;
                }
                Err(err) => {
                    tracing::warn!(%id, %err, "batch visibility lookup failed");
                    bag.add_error(format!("Failed to change entry: {id}"));
                    continue;
                }
            };

            if !authz::can_toggle_visibility(&entry, actor, privileges) {
                bag.add_error(format!(
                    "You don't have the permission to change that entry: {}",
                    entry.title
                ));
                continue;
            }

            match self.repo.set_entry_visible(id, visible).await {
                Ok(()) if visible => bag.add_success(format!("Entry is now visible: {}", entry.title)),
                Ok(()) => bag.add_success(format!("Entry is now hidden: {}", entry.title)),
                Err(err) => {
                    tracing::warn!(%id, %err, "batch visibility update failed");
                    if visible {
                        bag.add_error(format!("Failed to show entry: {}", entry.title));
                    } else {
                        bag.add_error(format!("Failed to hide entry: {}", entry.title));
                    }
                }
            }
        }

        bag
    }

    /// Adds a comment to an entry and notifies the entry's author.
    pub async fn add_comment(
        &self,
        entry_id: Uuid,
        comment: NewComment,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<EntryComment> {
        if !self.comments_enabled {
            return Err(AppError::PermissionDenied(
                "the adding of new comments was disabled by your administrator".into(),
            ));
        }

        if !privileges.create && !privileges.is_moderator() {
            return Err(AppError::PermissionDenied(
                "you are not allowed to add comments".into(),
            ));
        }

        let entry = self
            .repo
            .get_entry(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry", entry_id.to_string()))?;

        if !entry.visible && !entry.authored_by(actor) && !privileges.is_moderator() {
            return Err(AppError::PermissionDenied(
                "you don't have the permission to add a comment to this entry".into(),
            ));
        }

        if entry.closed && !privileges.is_moderator() {
            return Err(AppError::PermissionDenied(
                "the entry is currently locked for write access".into(),
            ));
        }

        if comment.title.trim().is_empty() {
            return Err(AppError::Validation("comment title must not be blank".into()));
        }
        if comment.content.trim().is_empty() {
            return Err(AppError::Validation(
                "comment content must not be blank".into(),
            ));
        }

        let record = EntryComment {
            id: Uuid::now_v7(),
            entry_id,
            title: comment.title,
            content: comment.content,
            author: Some(actor.account.clone()),
            time: chrono::Utc::now(),
        };
        self.repo.create_comment(record.clone()).await?;

        self.notify_comment(&entry, actor);

        Ok(record)
    }

    /// First step of the two-step comment deletion: fetch the comment for
    /// the confirmation view. Moderators only.
    pub async fn comment_for_confirmation(
        &self,
        id: Uuid,
        privileges: &PrivilegeSet,
    ) -> Result<EntryComment> {
        if !authz::is_moderator(privileges) {
            return Err(AppError::PermissionDenied(
                "only moderators may delete comments".into(),
            ));
        }

        self.repo
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment", id.to_string()))
    }

    /// Second step: deletes the comment once the moderator approved the
    /// confirmation. Returns `None` when the deletion was cancelled.
    pub async fn delete_comment(
        &self,
        id: Uuid,
        actor: &Actor,
        privileges: &PrivilegeSet,
        approved: bool,
    ) -> Result<Option<EntryComment>> {
        if !authz::is_moderator(privileges) {
            return Err(AppError::PermissionDenied(
                "only moderators may delete comments".into(),
            ));
        }

        if !approved {
            return Ok(None);
        }

        let comment = self
            .repo
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment", id.to_string()))?;

        self.repo.delete_comment(id).await?;

        // only deleting someone else's comment is a moderative action
        if comment.author.as_deref() != Some(actor.account.as_str()) {
            self.audit.log(&format!(
                "Moderative deletion of comment \"{}\" by {}",
                comment.title,
                comment.author_display()
            ));
        }

        Ok(Some(comment))
    }

    fn notify_lock_change(&self, entry: &Entry, actor: &Actor, closed: bool) {
        let Some(author) = entry.author.as_deref() else {
            // no notification if the author account is gone
            return;
        };

        // don't notify an author acting on their own entry
        if author == actor.account {
            return;
        }

        let (message, icon) = if closed {
            (
                format!(
                    "Your entry was locked: {} locked {}",
                    actor.display, entry.title
                ),
                "lock",
            )
        } else {
            (
                format!(
                    "Your entry was opened: {} opened {}",
                    actor.display, entry.title
                ),
                "pencil",
            )
        };

        self.notifier.notify(Notification {
            recipient: author.to_string(),
            message,
            icon: icon.to_string(),
            link: entry_link(entry.id),
        });
    }

    fn notify_comment(&self, entry: &Entry, actor: &Actor) {
        let Some(author) = entry.author.as_deref() else {
            return;
        };

        if author == actor.account {
            return;
        }

        self.notifier.notify(Notification {
            recipient: author.to_string(),
            message: format!(
                "New comment on your post: {} commented on {}",
                actor.display, entry.title
            ),
            icon: "comments".to_string(),
            link: entry_link(entry.id),
        });
    }
}

pub(crate) fn entry_link(id: Uuid) -> String {
    format!("/billboard/entry/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb_core::privilege::Privilege;
    use bb_core::testing::{InMemoryRepo, RecordingAuditLog, RecordingNotifier};

    struct Fixture {
        repo: Arc<InMemoryRepo>,
        notifier: Arc<RecordingNotifier>,
        audit: Arc<RecordingAuditLog>,
        service: ModerationService,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryRepo::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let audit = Arc::new(RecordingAuditLog::new());
        let service = ModerationService::new(
            repo.clone(),
            notifier.clone(),
            audit.clone(),
            true,
        );
        Fixture {
            repo,
            notifier,
            audit,
            service,
        }
    }

    async fn seed_entry(repo: &InMemoryRepo, author: Option<&str>, visible: bool, closed: bool) -> Entry {
        let entry = Entry {
            id: Uuid::now_v7(),
            title: format!("Entry of {}", author.unwrap_or("?")),
            description: "Something to offer.".to_string(),
            category_id: Uuid::now_v7(),
            author: author.map(str::to_string),
            visible,
            closed,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        repo.create_entry(entry.clone()).await.unwrap();
        entry
    }

    fn moderator() -> PrivilegeSet {
        PrivilegeSet::NONE.with(Privilege::Moderate)
    }

    fn creator() -> PrivilegeSet {
        PrivilegeSet::NONE.with(Privilege::Create)
    }

    #[tokio::test]
    async fn lock_requires_moderator() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, false).await;
        let alice = Actor::new("alice", "Alice");

        let err = f
            .service
            .lock(entry.id, &alice, &creator())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn lock_notifies_author_and_writes_audit_line() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, false).await;
        let bob = Actor::new("bob", "Bob");

        let locked = f.service.lock(entry.id, &bob, &moderator()).await.unwrap();
        assert!(locked.closed);

        let sent = f.notifier.notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "alice");
        assert_eq!(sent[0].icon, "lock");
        assert!(sent[0].message.contains("locked"));

        let lines = f.audit.entries();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("locked for write access"));

        // the toggle must not refresh updated_at
        let stored = f.repo.get_entry(entry.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, entry.updated_at);
    }

    #[tokio::test]
    async fn locking_your_own_entry_sends_no_notification() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("maude"), true, false).await;
        let maude = Actor::new("maude", "Maude");

        f.service.lock(entry.id, &maude, &moderator()).await.unwrap();
        assert!(f.notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn unlock_uses_the_open_icon() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, true).await;
        let bob = Actor::new("bob", "Bob");

        let opened = f.service.unlock(entry.id, &bob, &moderator()).await.unwrap();
        assert!(!opened.closed);

        let sent = f.notifier.notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].icon, "pencil");
    }

    #[tokio::test]
    async fn orphaned_entry_lock_skips_notification() {
        let f = fixture();
        let entry = seed_entry(&f.repo, None, true, false).await;
        let bob = Actor::new("bob", "Bob");

        f.service.lock(entry.id, &bob, &moderator()).await.unwrap();
        assert!(f.notifier.notifications().is_empty());
        assert_eq!(f.audit.entries().len(), 1);
    }

    #[tokio::test]
    async fn hide_is_idempotent() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, false).await;
        let alice = Actor::new("alice", "Alice");

        let first = f
            .service
            .set_visibility(entry.id, false, &alice, &PrivilegeSet::NONE)
            .await
            .unwrap();
        assert!(!first.visible);

        let second = f
            .service
            .set_visibility(entry.id, false, &alice, &PrivilegeSet::NONE)
            .await
            .unwrap();
        assert!(!second.visible);
    }

    // Scenario D: batch over three entries, two owned, actor not moderator.
    #[tokio::test]
    async fn batch_hide_accumulates_per_item_results() {
        let f = fixture();
        let mine_a = seed_entry(&f.repo, Some("alice"), true, false).await;
        let mine_b = seed_entry(&f.repo, Some("alice"), true, false).await;
        let foreign = seed_entry(&f.repo, Some("bob"), true, false).await;
        let alice = Actor::new("alice", "Alice");

        let bag = f
            .service
            .batch(
                BatchVisibilityAction::Hide,
                &[mine_a.id, mine_b.id, foreign.id],
                &alice,
                &creator(),
            )
            .await;

        assert_eq!(bag.successes().count(), 2);
        assert_eq!(bag.errors().count(), 1);
        assert!(bag.errors().next().unwrap().text.contains("permission"));

        assert!(!f.repo.get_entry(mine_a.id).await.unwrap().unwrap().visible);
        assert!(f.repo.get_entry(foreign.id).await.unwrap().unwrap().visible);
    }

    #[tokio::test]
    async fn batch_contains_store_failures_per_item() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, false).await;
        let alice = Actor::new("alice", "Alice");

        f.repo.set_fail_writes(true);
        let bag = f
            .service
            .batch(BatchVisibilityAction::Hide, &[entry.id], &alice, &creator())
            .await;

        assert_eq!(bag.errors().count(), 1);
        assert!(bag.errors().next().unwrap().text.starts_with("Failed to hide"));
    }

    #[tokio::test]
    async fn comment_on_closed_entry_is_moderator_only() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, true).await;
        let bob = Actor::new("bob", "Bob");

        let comment = NewComment {
            title: "Still available?".to_string(),
            content: "Would take it.".to_string(),
        };

        let err = f
            .service
            .add_comment(entry.id, comment.clone(), &bob, &creator())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));

        let added = f
            .service
            .add_comment(entry.id, comment, &bob, &moderator())
            .await
            .unwrap();
        assert_eq!(added.author.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn comment_on_hidden_entry_requires_author_or_moderator() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), false, false).await;
        let alice = Actor::new("alice", "Alice");
        let bob = Actor::new("bob", "Bob");

        assert!(f
            .service
            .add_comment(
                entry.id,
                NewComment {
                    title: "t".into(),
                    content: "c".into()
                },
                &bob,
                &creator(),
            )
            .await
            .is_err());

        assert!(f
            .service
            .add_comment(
                entry.id,
                NewComment {
                    title: "t".into(),
                    content: "c".into()
                },
                &alice,
                &creator(),
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn comment_notifies_entry_author() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, false).await;
        let bob = Actor::new("bob", "Bob");

        f.service
            .add_comment(
                entry.id,
                NewComment {
                    title: "Hi".into(),
                    content: "Interested.".into(),
                },
                &bob,
                &creator(),
            )
            .await
            .unwrap();

        let sent = f.notifier.notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "alice");
        assert_eq!(sent[0].icon, "comments");
    }

    #[tokio::test]
    async fn blank_comment_fields_fail_validation() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, false).await;
        let bob = Actor::new("bob", "Bob");

        let err = f
            .service
            .add_comment(
                entry.id,
                NewComment {
                    title: "  ".into(),
                    content: "text".into(),
                },
                &bob,
                &creator(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn disabled_comments_reject_everyone() {
        let repo = Arc::new(InMemoryRepo::new());
        let service = ModerationService::new(
            repo.clone(),
            Arc::new(RecordingNotifier::new()),
            Arc::new(RecordingAuditLog::new()),
            false,
        );
        let entry = seed_entry(&repo, Some("alice"), true, false).await;

        let err = service
            .add_comment(
                entry.id,
                NewComment {
                    title: "t".into(),
                    content: "c".into(),
                },
                &Actor::new("bob", "Bob"),
                &moderator(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn deleting_a_foreign_comment_is_audited() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, false).await;
        let comment = EntryComment {
            id: Uuid::now_v7(),
            entry_id: entry.id,
            title: "Spam".to_string(),
            content: "Buy now!".to_string(),
            author: Some("carol".to_string()),
            time: chrono::Utc::now(),
        };
        f.repo.create_comment(comment.clone()).await.unwrap();
        let bob = Actor::new("bob", "Bob");

        // confirmation step hands out the comment
        let confirmed = f
            .service
            .comment_for_confirmation(comment.id, &moderator())
            .await
            .unwrap();
        assert_eq!(confirmed.id, comment.id);

        let deleted = f
            .service
            .delete_comment(comment.id, &bob, &moderator(), true)
            .await
            .unwrap();
        assert!(deleted.is_some());
        assert!(f.repo.get_comment(comment.id).await.unwrap().is_none());

        let lines = f.audit.entries();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Moderative deletion of comment"));
    }

    #[tokio::test]
    async fn deleting_your_own_comment_is_not_audited() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, false).await;
        let comment = EntryComment {
            id: Uuid::now_v7(),
            entry_id: entry.id,
            title: "Note".to_string(),
            content: "Mine.".to_string(),
            author: Some("bob".to_string()),
            time: chrono::Utc::now(),
        };
        f.repo.create_comment(comment.clone()).await.unwrap();

        f.service
            .delete_comment(comment.id, &Actor::new("bob", "Bob"), &moderator(), true)
            .await
            .unwrap();
        assert!(f.audit.entries().is_empty());
    }

    #[tokio::test]
    async fn unapproved_deletion_is_a_cancel() {
        let f = fixture();
        let entry = seed_entry(&f.repo, Some("alice"), true, false).await;
        let comment = EntryComment {
            id: Uuid::now_v7(),
            entry_id: entry.id,
            title: "Keep me".to_string(),
            content: "Please.".to_string(),
            author: Some("carol".to_string()),
            time: chrono::Utc::now(),
        };
        f.repo.create_comment(comment.clone()).await.unwrap();

        let outcome = f
            .service
            .delete_comment(comment.id, &Actor::new("bob", "Bob"), &moderator(), false)
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(f.repo.get_comment(comment.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn comment_deletion_requires_moderator() {
        let f = fixture();
        let err = f
            .service
            .delete_comment(Uuid::now_v7(), &Actor::new("bob", "Bob"), &creator(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }
}
