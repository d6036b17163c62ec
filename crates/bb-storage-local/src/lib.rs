//! # bb-storage-local
//!
//! Local filesystem implementation of `FileStore`. One flat directory,
//! created lazily on first write; the services decide file names and
//! formats, this crate only moves bytes.

use async_trait::async_trait;
use bb_core::error::{AppError, Result};
use bb_core::traits::FileStore;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, name: &str, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(AppError::internal)?;

        let target = self.root.join(name);
        fs::write(&target, data).await.map_err(AppError::internal)?;
        tracing::debug!(path = %target.display(), bytes = data.len(), "stored file");
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let target = self.root.join(name);
        match fs::read(&target).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(AppError::NotFound(
                "File",
                target.display().to_string(),
            )),
            Err(err) => Err(AppError::internal(err)),
        }
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let target = self.root.join(name);
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            // an already-absent file leaves us in the desired state
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::internal(err)),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_creates_the_root_directory_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path().join("uploads"));

        store.put("a.png", b"png-bytes").await.unwrap();
        assert_eq!(store.read("a.png").await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.put("b.png", b"x").await.unwrap();
        store.remove("b.png").await.unwrap();
        store.remove("b.png").await.unwrap();

        let err = store.read("b.png").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn path_is_pure_resolution() {
        let store = LocalFileStore::new("/var/lib/billboard/images");
        assert_eq!(
            store.path("abc.png"),
            PathBuf::from("/var/lib/billboard/images/abc.png")
        );
    }
}
