//! In-memory watchlist repository for testing.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{StoreError, WatchlistRepository};
use crate::domain::watchlist::{WatchEntry, sort_by_order};

/// In-memory implementation of `WatchlistRepository`.
///
/// Suitable for testing and development. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryWatchlistRepository {
    entries: RwLock<Vec<WatchEntry>>,
    saves: RwLock<usize>,
}

impl InMemoryWatchlistRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-filled with entries.
    #[must_use]
    pub fn with_entries(entries: Vec<WatchEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            saves: RwLock::new(0),
        }
    }

    /// Stored entries as last saved.
    #[must_use]
    pub fn stored(&self) -> Vec<WatchEntry> {
        self.entries.read().clone()
    }

    /// Number of completed saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.read()
    }
}

#[async_trait]
impl WatchlistRepository for InMemoryWatchlistRepository {
    async fn load(&self) -> Result<Vec<WatchEntry>, StoreError> {
        let mut entries = self.entries.read().clone();
        sort_by_order(&mut entries);
        Ok(entries)
    }

    async fn save(&self, entries: &[WatchEntry]) -> Result<(), StoreError> {
        *self.entries.write() = entries.to_vec();
        *self.saves.write() += 1;
        Ok(())
    }
}
