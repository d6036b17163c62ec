//! The externally editable rules text shown to posting users. A missing or
//! unreadable file falls back to a built-in default; updates overwrite the
//! whole file.

use bb_core::error::{AppError, Result};
use std::path::PathBuf;
use tokio::fs;

/// Shown when no custom rules text has been set.
pub const DEFAULT_RULES: &str = "The bill-board is only intended for small things. \
Please don't offer things which have a worth of more than 100 euro.";

pub struct RulesStore {
    path: PathBuf,
}

impl RulesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the current rules text, or the default when none is set.
    pub async fn read(&self) -> String {
        match fs::read_to_string(&self.path).await {
            Ok(rules) => rules,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), %err, "falling back to default rules");
                DEFAULT_RULES.to_string()
            }
        }
    }

    /// Overwrites the whole rules file, creating parent directories as
    /// needed.
    pub async fn write(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(AppError::internal)?;
        }

        fs::write(&self.path, content)
            .await
            .map_err(AppError::internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_the_default_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = RulesStore::new(dir.path().join("rules.cfg"));
        assert_eq!(store.read().await, DEFAULT_RULES);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RulesStore::new(dir.path().join("cfg").join("rules.cfg"));

        store.write("Be kind. Keep it under 100 euro.").await.unwrap();
        assert_eq!(store.read().await, "Be kind. Keep it under 100 euro.");

        // the whole file is replaced, not appended to
        store.write("New rules.").await.unwrap();
        assert_eq!(store.read().await, "New rules.");
    }
}
