//! JSON file watchlist repository.
//!
//! Stores the whole watchlist as a pretty-printed JSON array. Writes go to a
//! sibling temporary file that is renamed over the target, so a crash
//! mid-write leaves the previous list intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{StoreError, WatchlistRepository};
use crate::domain::watchlist::{WatchEntry, sort_by_order};

/// File-backed implementation of `WatchlistRepository`.
#[derive(Debug)]
pub struct JsonFileWatchlistRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileWatchlistRepository {
    /// Create a repository for the given file. The file need not exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl WatchlistRepository for JsonFileWatchlistRepository {
    async fn load(&self) -> Result<Vec<WatchEntry>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Watchlist file not found, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries: Vec<WatchEntry> = serde_json::from_slice(&raw)?;
        sort_by_order(&mut entries);
        Ok(entries)
    }

    async fn save(&self, entries: &[WatchEntry]) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(entries)?;
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &encoded).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), entries = entries.len(), "Watchlist saved");
        Ok(())
    }
}
