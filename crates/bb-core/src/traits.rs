//! # Core Traits (Ports)
//!
//! Every collaborator the bill-board depends on is an explicit port. The
//! services receive implementations by constructor injection; there is no
//! global service lookup.

use crate::error::Result;
use crate::models::{Actor, Category, Entry, EntryComment, EntryImage, Notification};
use crate::privilege::{Privilege, PrivilegeSet};
use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

/// Data persistence contract for categories, entries, comments and images.
///
/// The store is an opaque relational engine; the bill-board assumes single
/// read-modify-write requests and the store's transaction isolation. Two
/// concurrent writers toggling the same flag race at last-write-wins, which
/// is a known and accepted limitation for this domain's low contention.
#[async_trait]
pub trait BillboardRepo: Send + Sync {
    // Category operations
    async fn create_category(&self, category: Category) -> Result<()>;
    async fn update_category(&self, category: &Category) -> Result<()>;
    /// Callers must check the referenced-entries invariant first; the
    /// implementation is free to enforce it again.
    async fn delete_category(&self, id: Uuid) -> Result<()>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn count_categories(&self) -> Result<u64>;
    async fn count_entries_in_category(&self, id: Uuid) -> Result<u64>;

    // Entry operations
    async fn create_entry(&self, entry: Entry) -> Result<()>;
    async fn get_entry(&self, id: Uuid) -> Result<Option<Entry>>;
    async fn list_entries(&self) -> Result<Vec<Entry>>;
    /// Writes title, description, category, visibility and `updated_at`.
    /// This is the only entry write that touches `updated_at`.
    async fn update_entry_content(&self, entry: &Entry) -> Result<()>;
    async fn set_entry_visible(&self, id: Uuid, visible: bool) -> Result<()>;
    async fn set_entry_closed(&self, id: Uuid, closed: bool) -> Result<()>;
    /// Deletes the entry together with its comments and images in one
    /// transaction. Backing image files are the image manager's business.
    async fn delete_entry(&self, id: Uuid) -> Result<()>;

    // Comment operations
    async fn create_comment(&self, comment: EntryComment) -> Result<()>;
    async fn get_comment(&self, id: Uuid) -> Result<Option<EntryComment>>;
    async fn list_comments(&self, entry_id: Uuid) -> Result<Vec<EntryComment>>;
    async fn delete_comment(&self, id: Uuid) -> Result<()>;

    // Image record operations
    async fn create_image(&self, image: EntryImage) -> Result<()>;
    async fn get_image(&self, id: Uuid) -> Result<Option<EntryImage>>;
    async fn list_images(&self, entry_id: Uuid) -> Result<Vec<EntryImage>>;
    /// Rows still carrying inline bytes, i.e. not yet migrated to the store.
    async fn list_legacy_images(&self) -> Result<Vec<EntryImage>>;
    /// Records the store identifier of a migrated row and clears its
    /// inline bytes.
    async fn finish_image_migration(&self, id: Uuid, image_id: &str) -> Result<()>;
    async fn delete_image(&self, id: Uuid) -> Result<()>;
}

/// File storage contract: a directory-backed put/read/delete-by-name API.
/// The bill-board decides naming and format, not the storage medium.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, name: &str, data: &[u8]) -> Result<()>;
    async fn read(&self, name: &str) -> Result<Vec<u8>>;
    /// Idempotent: removing an already-absent file is not an error.
    async fn remove(&self, name: &str) -> Result<()>;
    /// Deterministic path resolution for display; performs no I/O.
    fn path(&self, name: &str) -> PathBuf;
}

/// Notification collaborator. Fire-and-forget; delivery guarantees are out
/// of the bill-board's scope.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Audit/log sink. The bill-board decides when and what to log, the adapter
/// decides where the lines go and carries the module tag.
pub trait AuditLog: Send + Sync {
    fn log(&self, line: &str);
}

/// Identity/claims provider. The bill-board never computes privileges
/// itself; it asks this port per flag.
pub trait PrivilegeProvider: Send + Sync {
    fn has_privilege(&self, actor: &Actor, privilege: Privilege) -> bool;

    /// Resolves the full capability set of an actor in one go.
    fn privileges(&self, actor: &Actor) -> PrivilegeSet {
        let mut set = PrivilegeSet::NONE;
        for p in [
            Privilege::View,
            Privilege::Create,
            Privilege::Moderate,
            Privilege::Manage,
        ] {
            if self.has_privilege(actor, p) {
                set = set.with(p);
            }
        }
        set
    }
}
