//! In-memory implementations of the ports for unit tests of dependent
//! crates. Compiled only with the `testing` feature.

use crate::error::{AppError, Result};
use crate::models::{Category, Entry, EntryComment, EntryImage, Notification};
use crate::traits::{AuditLog, BillboardRepo, FileStore, Notifier};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct RepoState {
    categories: HashMap<Uuid, Category>,
    entries: HashMap<Uuid, Entry>,
    comments: HashMap<Uuid, EntryComment>,
    images: HashMap<Uuid, EntryImage>,
}

/// Hash-map backed repository. `fail_writes` makes every mutating call
/// return `AppError::Internal`, which the batch tests use to exercise
/// per-item error containment.
#[derive(Default)]
pub struct InMemoryRepo {
    state: Mutex<RepoState>,
    pub fail_writes: AtomicBool,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("injected write failure".into()));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RepoState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl BillboardRepo for InMemoryRepo {
    async fn create_category(&self, category: Category) -> Result<()> {
        self.check_write()?;
        self.lock().categories.insert(category.id, category);
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        self.check_write()?;
        self.lock().categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> Result<()> {
        self.check_write()?;
        self.lock().categories.remove(&id);
        Ok(())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.lock().categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut all: Vec<_> = self.lock().categories.values().cloned().collect();
        all.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(all)
    }

    async fn count_categories(&self) -> Result<u64> {
        Ok(self.lock().categories.len() as u64)
    }

    async fn count_entries_in_category(&self, id: Uuid) -> Result<u64> {
        Ok(self
            .lock()
            .entries
            .values()
            .filter(|e| e.category_id == id)
            .count() as u64)
    }

    async fn create_entry(&self, entry: Entry) -> Result<()> {
        self.check_write()?;
        self.lock().entries.insert(entry.id, entry);
        Ok(())
    }

    async fn get_entry(&self, id: Uuid) -> Result<Option<Entry>> {
        Ok(self.lock().entries.get(&id).cloned())
    }

    async fn list_entries(&self) -> Result<Vec<Entry>> {
        let mut all: Vec<_> = self.lock().entries.values().cloned().collect();
        all.sort_by_key(|e| e.created_at);
        Ok(all)
    }

    async fn update_entry_content(&self, entry: &Entry) -> Result<()> {
        self.check_write()?;
        self.lock().entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn set_entry_visible(&self, id: Uuid, visible: bool) -> Result<()> {
        self.check_write()?;
        if let Some(e) = self.lock().entries.get_mut(&id) {
            e.visible = visible;
        }
        Ok(())
    }

    async fn set_entry_closed(&self, id: Uuid, closed: bool) -> Result<()> {
        self.check_write()?;
        if let Some(e) = self.lock().entries.get_mut(&id) {
            e.closed = closed;
        }
        Ok(())
    }

    async fn delete_entry(&self, id: Uuid) -> Result<()> {
        self.check_write()?;
        let mut state = self.lock();
        state.entries.remove(&id);
        state.comments.retain(|_, c| c.entry_id != id);
        state.images.retain(|_, i| i.entry_id != id);
        Ok(())
    }

    async fn create_comment(&self, comment: EntryComment) -> Result<()> {
        self.check_write()?;
        self.lock().comments.insert(comment.id, comment);
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<EntryComment>> {
        Ok(self.lock().comments.get(&id).cloned())
    }

    async fn list_comments(&self, entry_id: Uuid) -> Result<Vec<EntryComment>> {
        let mut all: Vec<_> = self
            .lock()
            .comments
            .values()
            .filter(|c| c.entry_id == entry_id)
            .cloned()
            .collect();
        all.sort_by_key(|c| c.time);
        Ok(all)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<()> {
        self.check_write()?;
        self.lock().comments.remove(&id);
        Ok(())
    }

    async fn create_image(&self, image: EntryImage) -> Result<()> {
        self.check_write()?;
        self.lock().images.insert(image.id, image);
        Ok(())
    }

    async fn get_image(&self, id: Uuid) -> Result<Option<EntryImage>> {
        Ok(self.lock().images.get(&id).cloned())
    }

    async fn list_images(&self, entry_id: Uuid) -> Result<Vec<EntryImage>> {
        let mut all: Vec<_> = self
            .lock()
            .images
            .values()
            .filter(|i| i.entry_id == entry_id)
            .cloned()
            .collect();
        all.sort_by_key(|i| i.time);
        Ok(all)
    }

    async fn list_legacy_images(&self) -> Result<Vec<EntryImage>> {
        Ok(self
            .lock()
            .images
            .values()
            .filter(|i| i.legacy_data.is_some())
            .cloned()
            .collect())
    }

    async fn finish_image_migration(&self, id: Uuid, image_id: &str) -> Result<()> {
        self.check_write()?;
        if let Some(i) = self.lock().images.get_mut(&id) {
            i.image_id = Some(image_id.to_string());
            i.legacy_data = None;
        }
        Ok(())
    }

    async fn delete_image(&self, id: Uuid) -> Result<()> {
        self.check_write()?;
        self.lock().images.remove(&id);
        Ok(())
    }
}

/// Hash-map backed file store rooted at a fictitious directory.
#[derive(Default)]
pub struct InMemoryFileStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn put(&self, name: &str, data: &[u8]) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound("File", name.to_string()))
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.files.lock().unwrap().remove(name);
        Ok(())
    }

    fn path(&self, name: &str) -> PathBuf {
        PathBuf::from("/var/lib/billboard/images").join(name)
    }
}

/// Notifier that records every notification it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

/// Audit log that records every line it receives.
#[derive(Default)]
pub struct RecordingAuditLog {
    pub lines: Mutex<Vec<String>>,
}

impl RecordingAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl AuditLog for RecordingAuditLog {
    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
