//! # bb-db-sqlite
//!
//! This module implements the data mapping between the SQLite relational
//! model and the `bb-core` domain models.

use async_trait::async_trait;
use bb_core::error::{AppError, Result};
use bb_core::models::{Category, Entry, EntryComment, EntryImage};
use bb_core::traits::BillboardRepo;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id          BLOB PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS entries (
    id          BLOB PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    category    BLOB NOT NULL REFERENCES categories (id),
    author      TEXT,
    visible     INTEGER NOT NULL DEFAULT 1,
    closed      INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS entry_comments (
    id       BLOB PRIMARY KEY,
    entry    BLOB NOT NULL REFERENCES entries (id),
    title    TEXT NOT NULL,
    content  TEXT NOT NULL,
    author   TEXT,
    time     TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS entry_images (
    id          BLOB PRIMARY KEY,
    entry       BLOB NOT NULL REFERENCES entries (id),
    image_id    TEXT,
    image_name  TEXT NOT NULL,
    description TEXT,
    author      TEXT,
    time        TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    legacy_data BLOB
);
"#;

pub struct SqliteBillboardRepo {
    pool: SqlitePool,
}

// Helpers for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

fn internal(err: sqlx::Error) -> AppError {
    AppError::internal(err)
}

impl SqliteBillboardRepo {
    /// Opens (and creates if necessary) the database and its schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(internal)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(internal)?;

        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(internal)?;
        }

        Ok(Self { pool })
    }

    fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Category {
        Category {
            id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
            title: row.get("title"),
            description: row.get("description"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        }
    }

    fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Entry {
        Entry {
            id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
            title: row.get("title"),
            description: row.get("description"),
            category_id: blob_to_uuid(row.get::<Vec<u8>, _>("category").as_slice()),
            author: row.get("author"),
            visible: row.get("visible"),
            closed: row.get("closed"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
            updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        }
    }

    fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> EntryComment {
        EntryComment {
            id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
            entry_id: blob_to_uuid(row.get::<Vec<u8>, _>("entry").as_slice()),
            title: row.get("title"),
            content: row.get("content"),
            author: row.get("author"),
            time: row.get::<DateTime<Utc>, _>("time"),
        }
    }

    fn image_from_row(row: &sqlx::sqlite::SqliteRow) -> EntryImage {
        EntryImage {
            id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
            entry_id: blob_to_uuid(row.get::<Vec<u8>, _>("entry").as_slice()),
            image_id: row.get("image_id"),
            image_name: row.get("image_name"),
            description: row.get("description"),
            author: row.get("author"),
            time: row.get::<DateTime<Utc>, _>("time"),
            updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
            legacy_data: row.get("legacy_data"),
        }
    }
}

#[async_trait]
impl BillboardRepo for SqliteBillboardRepo {
    async fn create_category(&self, category: Category) -> Result<()> {
        sqlx::query(
            "INSERT INTO categories (id, title, description, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(category.id))
        .bind(category.title)
        .bind(category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        sqlx::query("UPDATE categories SET title = ?, description = ? WHERE id = ?")
            .bind(&category.title)
            .bind(&category.description)
            .bind(uuid_to_blob(category.id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    /// Refuses to delete a category that entries still reference; the
    /// category constraint on entries must never dangle.
    async fn delete_category(&self, id: Uuid) -> Result<()> {
        let referencing = self.count_entries_in_category(id).await?;
        if referencing > 0 {
            return Err(AppError::InvalidState(format!(
                "category is still referenced by {referencing} entries"
            )));
        }

        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        Ok(row.as_ref().map(Self::category_from_row))
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories ORDER BY title ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows.iter().map(Self::category_from_row).collect())
    }

    async fn count_categories(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM categories")
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn count_entries_in_category(&self, id: Uuid) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM entries WHERE category = ?")
            .bind(uuid_to_blob(id))
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn create_entry(&self, entry: Entry) -> Result<()> {
        sqlx::query(
            "INSERT INTO entries (id, title, description, category, author, visible, closed, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(entry.id))
        .bind(entry.title)
        .bind(entry.description)
        .bind(uuid_to_blob(entry.category_id))
        .bind(entry.author)
        .bind(entry.visible)
        .bind(entry.closed)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn get_entry(&self, id: Uuid) -> Result<Option<Entry>> {
        let row = sqlx::query("SELECT * FROM entries WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        Ok(row.as_ref().map(Self::entry_from_row))
    }

    async fn list_entries(&self) -> Result<Vec<Entry>> {
        let rows = sqlx::query("SELECT * FROM entries ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows.iter().map(Self::entry_from_row).collect())
    }

    async fn update_entry_content(&self, entry: &Entry) -> Result<()> {
        sqlx::query(
            "UPDATE entries SET title = ?, description = ?, category = ?, visible = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&entry.title)
        .bind(&entry.description)
        .bind(uuid_to_blob(entry.category_id))
        .bind(entry.visible)
        .bind(entry.updated_at)
        .bind(uuid_to_blob(entry.id))
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    // Deliberately leaves updated_at alone: visibility is not a content edit.
    async fn set_entry_visible(&self, id: Uuid, visible: bool) -> Result<()> {
        sqlx::query("UPDATE entries SET visible = ? WHERE id = ?")
            .bind(visible)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn set_entry_closed(&self, id: Uuid, closed: bool) -> Result<()> {
        sqlx::query("UPDATE entries SET closed = ? WHERE id = ?")
            .bind(closed)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    /// Atomic removal of an entry and everything it owns.
    ///
    /// # Developer Note
    /// Using a transaction ensures we never end up with orphaned comments
    /// or image records if one of the deletes fails halfway.
    async fn delete_entry(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(internal)?;

        sqlx::query("DELETE FROM entry_comments WHERE entry = ?")
            .bind(uuid_to_blob(id))
            .execute(&mut *tx)
            .await
            .map_err(internal)?;

        sqlx::query("DELETE FROM entry_images WHERE entry = ?")
            .bind(uuid_to_blob(id))
            .execute(&mut *tx)
            .await
            .map_err(internal)?;

        sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&mut *tx)
            .await
            .map_err(internal)?;

        tx.commit().await.map_err(internal)?;
        Ok(())
    }

    async fn create_comment(&self, comment: EntryComment) -> Result<()> {
        sqlx::query(
            "INSERT INTO entry_comments (id, entry, title, content, author, time) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(comment.id))
        .bind(uuid_to_blob(comment.entry_id))
        .bind(comment.title)
        .bind(comment.content)
        .bind(comment.author)
        .bind(comment.time)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<EntryComment>> {
        let row = sqlx::query("SELECT * FROM entry_comments WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        Ok(row.as_ref().map(Self::comment_from_row))
    }

    async fn list_comments(&self, entry_id: Uuid) -> Result<Vec<EntryComment>> {
        let rows = sqlx::query("SELECT * FROM entry_comments WHERE entry = ? ORDER BY time ASC")
            .bind(uuid_to_blob(entry_id))
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows.iter().map(Self::comment_from_row).collect())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM entry_comments WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn create_image(&self, image: EntryImage) -> Result<()> {
        sqlx::query(
            "INSERT INTO entry_images (id, entry, image_id, image_name, description, author, time, updated_at, legacy_data) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(image.id))
        .bind(uuid_to_blob(image.entry_id))
        .bind(image.image_id)
        .bind(image.image_name)
        .bind(image.description)
        .bind(image.author)
        .bind(image.time)
        .bind(image.updated_at)
        .bind(image.legacy_data)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn get_image(&self, id: Uuid) -> Result<Option<EntryImage>> {
        let row = sqlx::query("SELECT * FROM entry_images WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        Ok(row.as_ref().map(Self::image_from_row))
    }

    async fn list_images(&self, entry_id: Uuid) -> Result<Vec<EntryImage>> {
        let rows = sqlx::query("SELECT * FROM entry_images WHERE entry = ? ORDER BY time ASC")
            .bind(uuid_to_blob(entry_id))
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows.iter().map(Self::image_from_row).collect())
    }

    async fn list_legacy_images(&self) -> Result<Vec<EntryImage>> {
        let rows = sqlx::query("SELECT * FROM entry_images WHERE legacy_data IS NOT NULL")
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows.iter().map(Self::image_from_row).collect())
    }

    async fn finish_image_migration(&self, id: Uuid, image_id: &str) -> Result<()> {
        sqlx::query("UPDATE entry_images SET image_id = ?, legacy_data = NULL WHERE id = ?")
            .bind(image_id)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn delete_image(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM entry_images WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }
}
