//! Watchlist Management Integration Tests
//!
//! Tests watchlist mutations, persistence and their effect on polling.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use rust_decimal::Decimal;
use tokio::time::timeout;

use forex_rate_stream::{
    AggregatorConfig, InMemoryWatchlistRepository, Instrument, JsonFileWatchlistRepository, Quote,
    QuoteError, QuoteSource, RateAggregator, RateEvent, RateEventHub, StoreError, WatchEntry,
    WatchlistRepository, WatchlistService,
};

mock! {
    Repository {}

    #[async_trait]
    impl WatchlistRepository for Repository {
        async fn load(&self) -> Result<Vec<WatchEntry>, StoreError>;
        async fn save(&self, entries: &[WatchEntry]) -> Result<(), StoreError>;
    }
}

struct StaticSource;

#[async_trait]
impl QuoteSource for StaticSource {
    async fn fetch(&self, instrument: Instrument) -> Result<Quote, QuoteError> {
        Ok(Quote::new(
            instrument.base().code(),
            instrument.quote().code(),
            Decimal::new(10_840, 4),
            Decimal::new(10_860, 4),
            Decimal::new(10_850, 4),
            "2025-09-13T03:00:00Z",
        ))
    }
}

fn aggregator() -> Arc<RateAggregator> {
    Arc::new(RateAggregator::new(
        Arc::new(StaticSource),
        Arc::new(RateEventHub::with_defaults()),
        AggregatorConfig::default(),
    ))
}

fn entry(instrument: Instrument, order: i64) -> WatchEntry {
    WatchEntry::new(instrument, order)
}

fn pairs(entries: &[WatchEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.pair_string.as_str()).collect()
}

async fn service_with(
    entries: Vec<WatchEntry>,
) -> (WatchlistService, Arc<InMemoryWatchlistRepository>) {
    let repo = Arc::new(InMemoryWatchlistRepository::with_entries(entries));
    let service = WatchlistService::load(
        Arc::clone(&repo) as Arc<dyn WatchlistRepository>,
        aggregator(),
    )
    .await
    .unwrap();
    (service, repo)
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn load_sorts_by_order() {
    let (service, _repo) = service_with(vec![
        entry(Instrument::EurUsd, 7),
        entry(Instrument::UsdJpy, 2),
        entry(Instrument::GbpUsd, 4),
    ])
    .await;

    assert_eq!(
        pairs(&service.entries().await),
        vec!["USD/JPY", "GBP/USD", "EUR/USD"]
    );
}

#[tokio::test]
async fn load_failure_is_reported() {
    let mut repo = MockRepository::new();
    repo.expect_load()
        .returning(|| Err(StoreError::Io("permission denied".to_string())));

    let result = WatchlistService::load(Arc::new(repo), aggregator()).await;
    assert!(matches!(result, Err(StoreError::Io(_))));
}

// =============================================================================
// Add
// =============================================================================

#[tokio::test]
async fn add_appends_after_highest_order() {
    let (service, repo) = service_with(vec![
        entry(Instrument::UsdJpy, 0),
        entry(Instrument::EurUsd, 5),
    ])
    .await;

    let added = service
        .add_instruments(&[Instrument::GbpUsd, Instrument::AudUsd])
        .await;

    assert_eq!(added.iter().map(|e| e.order).collect::<Vec<_>>(), vec![6, 7]);
    assert!(added.iter().all(|e| e.is_active));
    assert_eq!(repo.save_count(), 1);
    assert_eq!(
        pairs(&repo.stored()),
        vec!["USD/JPY", "EUR/USD", "GBP/USD", "AUD/USD"]
    );
}

#[tokio::test]
async fn add_to_empty_list_starts_at_zero() {
    let (service, _repo) = service_with(Vec::new()).await;
    let added = service.add_instruments(&[Instrument::EurJpy]).await;
    assert_eq!(added[0].order, 0);
}

#[tokio::test]
async fn add_skips_instruments_already_listed() {
    let (service, repo) = service_with(vec![entry(Instrument::UsdJpy, 0)]).await;

    let added = service.add_instruments(&[Instrument::UsdJpy]).await;

    assert!(added.is_empty());
    assert_eq!(repo.save_count(), 0);
    assert_eq!(service.entries().await.len(), 1);
}

#[tokio::test]
async fn add_fetches_new_instrument_immediately() {
    let (service, _repo) = service_with(Vec::new()).await;
    let mut rx = service.aggregator().subscribe();

    service.add_instruments(&[Instrument::GbpJpy]).await;

    let updated = timeout(Duration::from_secs(1), async {
        loop {
            if let RateEvent::QuoteUpdated { instrument, .. } = rx.recv().await.unwrap() {
                return instrument;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(updated, Instrument::GbpJpy);
    assert!(service.aggregator().rate(Instrument::GbpJpy).is_some());
}

#[tokio::test]
async fn available_excludes_listed_instruments() {
    let (service, _repo) = service_with(vec![
        entry(Instrument::UsdJpy, 0),
        entry(Instrument::EurUsd, 1),
    ])
    .await;

    let available = service.available().await;
    assert_eq!(available.len(), Instrument::all().len() - 2);
    assert!(!available.contains(&Instrument::UsdJpy));
    assert!(!available.contains(&Instrument::EurUsd));
}

// =============================================================================
// Delete and Move
// =============================================================================

#[tokio::test]
async fn delete_removes_entries_and_rates() {
    let (service, repo) = service_with(vec![
        entry(Instrument::UsdJpy, 0),
        entry(Instrument::EurUsd, 1),
        entry(Instrument::GbpUsd, 2),
    ])
    .await;
    service
        .aggregator()
        .add_instrument(Instrument::EurUsd)
        .await
        .unwrap();

    let removed = service.delete_at(&BTreeSet::from([1])).await;

    assert_eq!(pairs(&removed), vec!["EUR/USD"]);
    assert_eq!(pairs(&repo.stored()), vec!["USD/JPY", "GBP/USD"]);
    assert!(service.aggregator().rate(Instrument::EurUsd).is_none());
    assert!(!service.aggregator().watched().contains(&Instrument::EurUsd));
}

#[tokio::test]
async fn delete_out_of_range_is_noop() {
    let (service, repo) = service_with(vec![entry(Instrument::UsdJpy, 0)]).await;
    assert!(service.delete_at(&BTreeSet::from([4])).await.is_empty());
    assert_eq!(repo.save_count(), 0);
}

#[tokio::test]
async fn move_renumbers_every_entry() {
    let (service, repo) = service_with(vec![
        entry(Instrument::UsdJpy, 0),
        entry(Instrument::EurUsd, 3),
        entry(Instrument::GbpUsd, 9),
    ])
    .await;

    service.move_entries(&BTreeSet::from([2]), 0).await;

    let entries = service.entries().await;
    assert_eq!(pairs(&entries), vec!["GBP/USD", "USD/JPY", "EUR/USD"]);
    assert_eq!(
        entries.iter().map(|e| e.order).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(repo.stored(), entries);
}

// =============================================================================
// Toggle and Streaming
// =============================================================================

#[tokio::test]
async fn deactivate_stops_watching() {
    let first = entry(Instrument::UsdJpy, 0);
    let id = first.id.clone();
    let (service, repo) = service_with(vec![first, entry(Instrument::EurUsd, 1)]).await;
    service.start_streaming().await;
    assert_eq!(
        service.aggregator().watched(),
        vec![Instrument::UsdJpy, Instrument::EurUsd]
    );

    let updated = service.set_active(&id, false).await.unwrap();

    assert!(!updated.is_active);
    assert_eq!(service.aggregator().watched(), vec![Instrument::EurUsd]);
    assert!(!repo.stored()[0].is_active);
    service.stop_streaming();
}

#[tokio::test]
async fn reactivate_resumes_watching() {
    let mut first = entry(Instrument::UsdJpy, 0);
    first.is_active = false;
    let id = first.id.clone();
    let (service, _repo) = service_with(vec![first]).await;

    service.set_active(&id, true).await.unwrap();
    assert_eq!(service.aggregator().watched(), vec![Instrument::UsdJpy]);
}

#[tokio::test]
async fn toggle_unknown_id_returns_none() {
    let (service, repo) = service_with(vec![entry(Instrument::UsdJpy, 0)]).await;
    assert!(service.set_active("missing", false).await.is_none());
    assert_eq!(repo.save_count(), 0);
}

#[tokio::test]
async fn streaming_covers_active_known_entries_only() {
    let mut inactive = entry(Instrument::GbpUsd, 1);
    inactive.is_active = false;
    let mut unknown = entry(Instrument::AudUsd, 2);
    unknown.pair_string = "XAU/USD".to_string();

    let (service, _repo) =
        service_with(vec![entry(Instrument::UsdJpy, 0), inactive, unknown]).await;

    service.start_streaming().await;
    assert!(service.aggregator().is_streaming());
    assert_eq!(service.aggregator().watched(), vec![Instrument::UsdJpy]);

    service.stop_streaming();
    assert!(!service.aggregator().is_streaming());
}

#[tokio::test]
async fn streaming_with_nothing_active_stays_idle() {
    let (service, _repo) = service_with(Vec::new()).await;
    service.start_streaming().await;
    assert!(!service.aggregator().is_streaming());
    assert!(!service.aggregator().is_loading());
}

// =============================================================================
// Persistence Failures
// =============================================================================

#[tokio::test]
async fn failed_save_keeps_in_memory_mutation() {
    let mut repo = MockRepository::new();
    repo.expect_load().returning(|| Ok(Vec::new()));
    repo.expect_save()
        .times(1)
        .returning(|_| Err(StoreError::Io("disk full".to_string())));

    let service = WatchlistService::load(Arc::new(repo), aggregator())
        .await
        .unwrap();

    let added = service.add_instruments(&[Instrument::UsdJpy]).await;

    assert_eq!(added.len(), 1);
    assert_eq!(pairs(&service.entries().await), vec!["USD/JPY"]);
    assert_eq!(service.aggregator().watched(), vec![Instrument::UsdJpy]);
}

// =============================================================================
// JSON File Store
// =============================================================================

#[tokio::test]
async fn json_store_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("watchlist.json");

    let service = WatchlistService::load(
        Arc::new(JsonFileWatchlistRepository::new(path.clone())),
        aggregator(),
    )
    .await
    .unwrap();
    service
        .add_instruments(&[Instrument::UsdCad, Instrument::UsdJpy])
        .await;
    service.move_entries(&BTreeSet::from([1]), 0).await;

    let reloaded = WatchlistService::load(
        Arc::new(JsonFileWatchlistRepository::new(path.clone())),
        aggregator(),
    )
    .await
    .unwrap();

    assert_eq!(
        pairs(&reloaded.entries().await),
        vec!["USD/JPY", "USD/CAD"]
    );

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["pairString"], "USD/JPY");
    assert_eq!(raw[0]["isActive"], true);
    assert_eq!(raw[0]["order"], 0);
    assert!(raw[0]["dateAdded"].is_string());
}
