//! # Image Lifecycle Manager
//!
//! Converts uploaded binaries into canonically stored PNG files and keeps
//! the `EntryImage` record and its backing file consistent: the file write
//! always precedes the record insert, and deleting a record always removes
//! the record even when the file target was indeterminate (the legacy
//! behaviour silently kept the row, leaking orphaned metadata).

use crate::authz;
use bb_core::error::{AppError, Result};
use bb_core::models::{Actor, Entry, EntryImage};
use bb_core::privilege::PrivilegeSet;
use bb_core::traits::{AuditLog, BillboardRepo, FileStore};
use serde::Serialize;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Media types accepted for upload. Both the declared type and the sniffed
/// file content must match the list; everything is re-encoded to PNG on
/// disk regardless of the input format.
const ALLOWED_MIME_TYPES: [&str; 4] = ["image/gif", "image/jpeg", "image/png", "image/webp"];

/// An upload as received from the boundary, before any validation.
#[derive(Debug, Clone)]
pub struct NewImageUpload {
    pub entry_id: Uuid,
    /// Original filename, kept for display only.
    pub file_name: String,
    /// Declared media type of the upload.
    pub content_type: String,
    pub data: Vec<u8>,
    pub description: Option<String>,
}

/// Outcome of a legacy-blob migration run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MigrationReport {
    pub converted: u64,
    pub failed: u64,
}

pub struct ImageService {
    repo: Arc<dyn BillboardRepo>,
    store: Arc<dyn FileStore>,
    audit: Arc<dyn AuditLog>,
}

impl ImageService {
    pub fn new(
        repo: Arc<dyn BillboardRepo>,
        store: Arc<dyn FileStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self { repo, store, audit }
    }

    /// Validates, converts and stores a new upload. The record is persisted
    /// only after the file write succeeded; any conversion failure aborts
    /// before anything is written.
    pub async fn store(
        &self,
        upload: NewImageUpload,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<EntryImage> {
        let entry = self
            .repo
            .get_entry(upload.entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry", upload.entry_id.to_string()))?;

        self.check_upload_permission(&entry, actor, privileges)?;

        if upload.data.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".into()));
        }

        // parse the declared type so parameters ("; charset=...") don't matter
        let declared: mime::Mime = upload.content_type.parse().map_err(|_| {
            AppError::Validation(format!("unsupported image format: {}", upload.content_type))
        })?;
        if !ALLOWED_MIME_TYPES.contains(&declared.essence_str()) {
            return Err(AppError::Validation(format!(
                "unsupported image format: {}",
                upload.content_type
            )));
        }

        // the declared type is client input; the bytes themselves decide
        let detected = image::guess_format(&upload.data).map_err(|_| {
            AppError::Validation(format!(
                "file content does not match a supported image format (declared {})",
                upload.content_type
            ))
        })?;
        if !matches!(
            detected,
            image::ImageFormat::Gif
                | image::ImageFormat::Jpeg
                | image::ImageFormat::Png
                | image::ImageFormat::WebP
        ) {
            return Err(AppError::Validation(format!(
                "unsupported image format: {detected:?}"
            )));
        }

        let png = encode_png(&upload.data)?;

        // fresh random identifier, never derived from filename or content
        let image_id = Uuid::new_v4().simple().to_string();
        self.store.put(&file_name(&image_id), &png).await?;

        let now = chrono::Utc::now();
        let record = EntryImage {
            id: Uuid::now_v7(),
            entry_id: entry.id,
            image_id: Some(image_id),
            image_name: upload.file_name,
            description: upload.description,
            author: Some(actor.account.clone()),
            time: now,
            updated_at: now,
            legacy_data: None,
        };
        self.repo.create_image(record.clone()).await?;

        Ok(record)
    }

    /// Deletes an image record and its backing file. File removal is
    /// best-effort and idempotent; the record is removed in any case.
    pub async fn delete(
        &self,
        id: Uuid,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<EntryImage> {
        let image = self
            .repo
            .get_image(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Image", id.to_string()))?;

        let entry = self
            .repo
            .get_entry(image.entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry", image.entry_id.to_string()))?;

        let has_categories = self.repo.count_categories().await? > 0;
        if !authz::can_edit(Some(&entry), Some(actor), privileges, has_categories) {
            return Err(AppError::PermissionDenied(
                "you are not allowed to delete images of this entry".into(),
            ));
        }

        match image.image_id.as_deref() {
            Some(image_id) => self.store.remove(&file_name(image_id)).await?,
            None => tracing::warn!(
                image = %image.id,
                "image record has no store identifier, removing record only"
            ),
        }

        self.repo.delete_image(id).await?;

        if image.author.as_deref() != Some(actor.account.as_str()) {
            self.audit.log(&format!(
                "Moderative deletion of image \"{}\" of entry \"{}\" by {}",
                image.image_name,
                entry.title,
                image.author_display()
            ));
        }

        Ok(image)
    }

    /// Removes the backing files of all images of an entry. Used by the
    /// entry deletion flow before the row-level cascade runs.
    pub async fn delete_files_for_entry(&self, entry_id: Uuid) -> Result<()> {
        for image in self.repo.list_images(entry_id).await? {
            if let Some(image_id) = image.image_id.as_deref() {
                self.store.remove(&file_name(image_id)).await?;
            }
        }
        Ok(())
    }

    /// Deterministic path of the stored file: `<base>/<imageId>.png`.
    pub fn path(&self, image: &EntryImage) -> Result<PathBuf> {
        let image_id = image
            .image_id
            .as_deref()
            .ok_or_else(|| AppError::NotFound("Image file", image.id.to_string()))?;

        Ok(self.store.path(&file_name(image_id)))
    }

    /// Resolves an image of an entry for display, enforcing the view rule
    /// of the owning entry.
    pub async fn serve(
        &self,
        entry_id: Uuid,
        image_id: Uuid,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<PathBuf> {
        let entry = self
            .repo
            .get_entry(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry", entry_id.to_string()))?;

        if !authz::can_view(Some(&entry), Some(actor), privileges) {
            return Err(AppError::PermissionDenied(
                "you are not allowed to view this entry".into(),
            ));
        }

        let image = self
            .repo
            .get_image(image_id)
            .await?
            .filter(|image| image.entry_id == entry_id)
            .ok_or_else(|| AppError::NotFound("Image", image_id.to_string()))?;

        self.path(&image)
    }

    /// Converts legacy inline-blob rows into store files. One bad row does
    /// not stop the run; failures are logged and counted.
    pub async fn migrate_legacy(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();

        for image in self.repo.list_legacy_images().await? {
            let Some(data) = image.legacy_data.as_deref() else {
                continue;
            };

            match self.convert_legacy(image.id, data).await {
                Ok(()) => report.converted += 1,
                Err(err) => {
                    tracing::error!(
                        image = %image.id,
                        name = %image.image_name,
                        %err,
                        "could not convert legacy image blob to file"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn convert_legacy(&self, record_id: Uuid, data: &[u8]) -> Result<()> {
        let png = encode_png(data)?;
        let image_id = Uuid::new_v4().simple().to_string();
        self.store.put(&file_name(&image_id), &png).await?;
        self.repo.finish_image_migration(record_id, &image_id).await
    }

    fn check_upload_permission(
        &self,
        entry: &Entry,
        actor: &Actor,
        privileges: &PrivilegeSet,
    ) -> Result<()> {
        if !authz::is_author(entry, actor) && !privileges.is_moderator() {
            return Err(AppError::PermissionDenied(
                "you are not allowed to add an image to this entry".into(),
            ));
        }

        if entry.closed && !privileges.is_moderator() {
            return Err(AppError::PermissionDenied(
                "the entry is currently locked for write access".into(),
            ));
        }

        Ok(())
    }
}

fn file_name(image_id: &str) -> String {
    format!("{image_id}.png")
}

/// Decodes the upload and re-encodes it into the canonical on-disk format.
fn encode_png(data: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(data)
        .map_err(|err| AppError::Conversion(format!("could not decode image: {err}")))?;

    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|err| AppError::Conversion(format!("could not encode image: {err}")))?;

    Ok(png)
}
