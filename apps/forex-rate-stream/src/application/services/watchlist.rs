//! Watchlist Service
//!
//! Keeps the persisted watchlist and the rate aggregator in step. Every
//! mutation is applied in memory, forwarded to the aggregator and then
//! saved. A failed save is logged and counted; the in-memory list and the
//! aggregator keep the mutation.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::aggregator::RateAggregator;
use crate::application::ports::{StoreError, WatchlistRepository};
use crate::domain::instrument::Instrument;
use crate::domain::watchlist::{
    WatchEntry, active_instruments, move_offsets, next_order, renumber, sort_by_order,
};
use crate::infrastructure::metrics;

/// Watchlist use cases over a repository and an aggregator.
pub struct WatchlistService {
    repository: Arc<dyn WatchlistRepository>,
    aggregator: Arc<RateAggregator>,
    entries: Mutex<Vec<WatchEntry>>,
}

impl WatchlistService {
    /// Load the stored watchlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be read.
    pub async fn load(
        repository: Arc<dyn WatchlistRepository>,
        aggregator: Arc<RateAggregator>,
    ) -> Result<Self, StoreError> {
        let mut entries = repository.load().await?;
        sort_by_order(&mut entries);

        let unknown = entries.iter().filter(|e| e.instrument().is_none()).count();
        if unknown > 0 {
            tracing::warn!(count = unknown, "Ignoring watchlist entries with unknown pairs");
        }
        tracing::info!(entries = entries.len(), "Watchlist loaded");

        Ok(Self {
            repository,
            aggregator,
            entries: Mutex::new(entries),
        })
    }

    /// Entries ordered by `order`.
    pub async fn entries(&self) -> Vec<WatchEntry> {
        self.entries.lock().await.clone()
    }

    /// Instruments not yet in the watchlist, in enumeration order.
    pub async fn available(&self) -> Vec<Instrument> {
        let entries = self.entries.lock().await;
        let present: Vec<Instrument> = entries.iter().filter_map(WatchEntry::instrument).collect();
        Instrument::available(&present)
    }

    /// Aggregator fed by this watchlist.
    #[must_use]
    pub const fn aggregator(&self) -> &Arc<RateAggregator> {
        &self.aggregator
    }

    /// Begin polling the active entries, replacing any running timer.
    ///
    /// With no active entry the aggregator is left as it is.
    pub async fn start_streaming(&self) {
        let instruments = active_instruments(&self.entries.lock().await);
        self.aggregator.start(instruments);
    }

    /// Stop polling.
    pub fn stop_streaming(&self) {
        self.aggregator.stop();
    }

    /// Append instruments to the watchlist and fetch each immediately.
    ///
    /// Instruments already present are skipped. Returns the new entries.
    pub async fn add_instruments(&self, instruments: &[Instrument]) -> Vec<WatchEntry> {
        let mut entries = self.entries.lock().await;
        let mut order = next_order(&entries);
        let mut added = Vec::new();

        for &instrument in instruments {
            if entries.iter().any(|e| e.instrument() == Some(instrument)) {
                tracing::debug!(%instrument, "Instrument already in watchlist");
                continue;
            }

            let entry = WatchEntry::new(instrument, order);
            order += 1;
            entries.push(entry.clone());
            added.push(entry);
            drop(self.aggregator.add_instrument(instrument));
        }

        if !added.is_empty() {
            self.persist(&entries, "add").await;
        }
        added
    }

    /// Delete the entries at the given list offsets.
    ///
    /// Returns the deleted entries.
    pub async fn delete_at(&self, offsets: &BTreeSet<usize>) -> Vec<WatchEntry> {
        let mut entries = self.entries.lock().await;
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(entries.len());

        for (index, entry) in entries.drain(..).enumerate() {
            if offsets.contains(&index) {
                removed.push(entry);
            } else {
                kept.push(entry);
            }
        }
        *entries = kept;

        for instrument in removed.iter().filter_map(WatchEntry::instrument) {
            self.aggregator.remove_instrument(instrument);
        }

        if !removed.is_empty() {
            self.persist(&entries, "delete").await;
        }
        removed
    }

    /// Move entries in the list and renumber every entry's order.
    pub async fn move_entries(&self, offsets: &BTreeSet<usize>, destination: usize) {
        let mut entries = self.entries.lock().await;
        move_offsets(&mut entries, offsets, destination);
        renumber(&mut entries);
        self.persist(&entries, "move").await;
    }

    /// Toggle whether an entry is polled.
    ///
    /// Returns the updated entry, or `None` if no entry has that id.
    pub async fn set_active(&self, id: &str, active: bool) -> Option<WatchEntry> {
        let mut entries = self.entries.lock().await;
        let entry = entries.iter_mut().find(|e| e.id == id)?;
        if entry.is_active == active {
            return Some(entry.clone());
        }

        entry.is_active = active;
        let updated = entry.clone();

        if let Some(instrument) = updated.instrument() {
            if active {
                drop(self.aggregator.add_instrument(instrument));
            } else {
                self.aggregator.remove_instrument(instrument);
            }
        }

        self.persist(&entries, "toggle").await;
        Some(updated)
    }

    async fn persist(&self, entries: &[WatchEntry], operation: &'static str) {
        if let Err(e) = self.repository.save(entries).await {
            metrics::record_store_failure(operation);
            tracing::error!(operation, error = %e, "Failed to save watchlist");
        }
    }
}

impl std::fmt::Debug for WatchlistService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchlistService")
            .field("aggregator", &self.aggregator)
            .finish_non_exhaustive()
    }
}
