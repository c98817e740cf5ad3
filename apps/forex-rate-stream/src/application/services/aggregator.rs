//! Rate Aggregator
//!
//! Drives recurring polling cycles over the watched instruments, merges
//! successful quotes into the rate table and keeps the connectivity,
//! loading and error state that presentation layers read.
//!
//! # Lifecycle
//!
//! ```text
//!  idle ──start(non-empty)──► streaming ──stop()──► idle
//!                              │    ▲
//!                              └────┘ start(): timer swapped in place
//! ```
//!
//! Each `start` cancels the previous timer before arming a new one, so at
//! most one timer is ever active. The first tick fires immediately. Starting
//! with no instruments changes nothing.
//!
//! # Cycles
//!
//! A cycle fans out one fetch per watched instrument and joins them. Each
//! successful fetch updates the rate table on its own. When every fetch has
//! finished, connectivity is settled once (connected if any fetch produced
//! a quote) and the aggregate error is derived from the table: empty means
//! "Unable to fetch forex data".
//!
//! Cycles run as detached tasks. A timer tick that fires while the previous
//! cycle of the same timer is still running is skipped. Every `start` and
//! `stop` bumps a generation counter; a cycle that finishes after its
//! generation was superseded does not touch the loading or error state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::ports::QuoteSource;
use crate::domain::connectivity::{ConnectionMonitor, ConnectivityState};
use crate::domain::instrument::Instrument;
use crate::domain::quote::Quote;
use crate::domain::registry::{RateTable, WatchRegistry};
use crate::infrastructure::broadcast::{RateEvent, SharedRateEventHub};
use crate::infrastructure::metrics;

/// Error shown when a cycle ends with no rates at all.
pub const FETCH_FAILED_MESSAGE: &str = "Unable to fetch forex data";

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

// =============================================================================
// Configuration
// =============================================================================

/// Rate aggregator settings.
#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    /// Time between polling cycles.
    pub poll_interval: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time copy of everything a presentation layer renders.
#[derive(Debug, Clone, Serialize)]
pub struct RateSnapshot {
    /// Latest quote per instrument.
    pub rates: BTreeMap<Instrument, Quote>,
    /// Watched instruments in enumeration order.
    pub watched: Vec<Instrument>,
    /// Connectivity to the quote service.
    pub connectivity: ConnectivityState,
    /// Time of the most recent successful fetch.
    pub last_updated: Option<DateTime<Utc>>,
    /// Whether the first cycle after `start` is still pending.
    pub is_loading: bool,
    /// Aggregate error, if the last cycle produced no rates.
    pub error_message: Option<String>,
    /// Whether a polling timer is active.
    pub streaming: bool,
}

#[derive(Debug, Default)]
struct FeedStatus {
    last_updated: Option<DateTime<Utc>>,
    is_loading: bool,
    error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchOutcome {
    Stored,
    Discarded,
    Failed,
}

impl FetchOutcome {
    const fn produced_quote(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

// =============================================================================
// Shared State
// =============================================================================

struct AggregatorState {
    source: Arc<dyn QuoteSource>,
    registry: WatchRegistry,
    monitor: ConnectionMonitor,
    status: Mutex<FeedStatus>,
    events: SharedRateEventHub,
    generation: AtomicU64,
}

impl AggregatorState {
    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Fetch every watched instrument concurrently, then settle
    /// connectivity and the aggregate error once all of them finished.
    ///
    /// Timer cycles pass their generation; a superseded cycle leaves the
    /// loading and error state to the current one. `None` always settles.
    async fn run_cycle(&self, generation: Option<u64>) {
        let is_current = || generation.is_none_or(|g| g == self.current_generation());

        let instruments = self.registry.watched();
        if instruments.is_empty() {
            if is_current() {
                self.status.lock().is_loading = false;
            }
            return;
        }

        let started = Instant::now();
        let outcomes = join_all(instruments.iter().map(|&i| self.fetch_one(i))).await;
        let succeeded = outcomes
            .iter()
            .filter(|o| **o == FetchOutcome::Stored)
            .count();
        let failed = outcomes
            .iter()
            .filter(|o| **o == FetchOutcome::Failed)
            .count();

        self.settle_connectivity(outcomes.iter().any(|o| o.produced_quote()));
        metrics::record_cycle(started.elapsed());

        if !is_current() {
            tracing::debug!(succeeded, failed, "Superseded cycle completed");
            return;
        }

        let error_message = {
            let mut status = self.status.lock();
            status.is_loading = false;
            status.error_message = self
                .registry
                .rates()
                .is_empty()
                .then(|| FETCH_FAILED_MESSAGE.to_string());
            status.error_message.clone()
        };

        tracing::debug!(
            succeeded,
            failed,
            elapsed_ms = started.elapsed().as_millis(),
            "Polling cycle completed"
        );

        self.events.send(RateEvent::CycleCompleted {
            succeeded,
            failed,
            error_message,
        });
    }

    /// Fetch one instrument and store the quote if it is still watched.
    ///
    /// Connectivity is marked `connecting` here but settled by the caller.
    async fn fetch_one(&self, instrument: Instrument) -> FetchOutcome {
        if let Some(state) = self.monitor.begin_request() {
            self.publish_connectivity(state);
        }

        match self.source.fetch(instrument).await {
            Ok(quote) => {
                metrics::record_fetch(instrument, "ok");

                // Removal wins over a fetch that was already in flight.
                if !self.registry.contains(instrument) {
                    tracing::debug!(%instrument, "Discarding quote for unwatched instrument");
                    return FetchOutcome::Discarded;
                }

                let updated_at = quote.source_time().unwrap_or_else(Utc::now);
                self.registry.rates().upsert(instrument, quote.clone());
                self.status.lock().last_updated = Some(updated_at);

                tracing::trace!(%instrument, bid = %quote.bid, ask = %quote.ask, "Quote updated");
                self.events.send(RateEvent::QuoteUpdated { instrument, quote });
                FetchOutcome::Stored
            }
            Err(e) => {
                metrics::record_fetch(instrument, e.kind());
                tracing::warn!(%instrument, kind = e.kind(), error = %e, "Quote fetch failed");
                FetchOutcome::Failed
            }
        }
    }

    fn settle_connectivity(&self, connected: bool) {
        if let Some(state) = self.monitor.record_completion(connected) {
            self.publish_connectivity(state);
        }
    }

    fn publish_connectivity(&self, state: ConnectivityState) {
        metrics::set_connectivity(state);
        tracing::debug!(state = state.as_str(), "Connectivity changed");
        self.events.send(RateEvent::ConnectivityChanged(state));
    }
}

// =============================================================================
// Rate Aggregator
// =============================================================================

/// Recurring concurrent quote polling over a dynamic watched set.
pub struct RateAggregator {
    state: Arc<AggregatorState>,
    config: AggregatorConfig,
    timer: Mutex<Option<CancellationToken>>,
}

impl RateAggregator {
    /// Create an idle aggregator.
    #[must_use]
    pub fn new(
        source: Arc<dyn QuoteSource>,
        events: SharedRateEventHub,
        config: AggregatorConfig,
    ) -> Self {
        let rates = Arc::new(RateTable::new());
        Self {
            state: Arc::new(AggregatorState {
                source,
                registry: WatchRegistry::new(rates),
                monitor: ConnectionMonitor::new(),
                status: Mutex::new(FeedStatus::default()),
                events,
                generation: AtomicU64::new(0),
            }),
            config,
            timer: Mutex::new(None),
        }
    }

    /// Replace the watched set and (re)arm the polling timer.
    ///
    /// An empty set is ignored: no timer is created and a running one keeps
    /// polling its current set. Must be called from within a Tokio runtime.
    pub fn start(&self, instruments: impl IntoIterator<Item = Instrument>) {
        let instruments: Vec<Instrument> = instruments.into_iter().collect();

        if instruments.is_empty() {
            tracing::debug!("Start requested with no instruments, ignoring");
            return;
        }

        self.state.registry.set_watched(instruments);
        let watched = self.state.registry.watched();
        metrics::set_watched_instruments(watched.len());

        {
            let mut status = self.state.status.lock();
            status.is_loading = true;
            status.error_message = None;
        }

        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.cancel();
        }

        let generation = self.state.next_generation();
        let cancel = CancellationToken::new();
        tokio::spawn(run_timer(
            Arc::clone(&self.state),
            self.config.poll_interval,
            generation,
            cancel.clone(),
        ));
        *timer = Some(cancel);
        drop(timer);

        tracing::info!(
            instruments = watched.len(),
            interval_secs = self.config.poll_interval.as_secs(),
            "Rate streaming started"
        );
        self.state
            .events
            .send(RateEvent::StreamingStarted { instruments: watched });
    }

    /// Cancel the polling timer and clear the loading flag.
    ///
    /// Rates are kept. Fetches already in flight may still complete.
    pub fn stop(&self) {
        let timer = self.timer.lock().take();
        self.state.next_generation();
        self.state.status.lock().is_loading = false;

        if let Some(token) = timer {
            token.cancel();
            tracing::info!("Rate streaming stopped");
            self.state.events.send(RateEvent::StreamingStopped);
        }
    }

    /// Run one cycle now, independent of the timer.
    ///
    /// Does nothing when no instrument is watched.
    pub async fn refresh(&self) {
        if self.state.registry.is_empty() {
            return;
        }
        tracing::debug!("Manual refresh");
        self.state.run_cycle(None).await;
    }

    /// Watch an instrument and fetch it immediately.
    ///
    /// The returned handle resolves to `true` once a quote was stored.
    pub fn add_instrument(&self, instrument: Instrument) -> JoinHandle<bool> {
        if self.state.registry.add(instrument) {
            metrics::set_watched_instruments(self.state.registry.len());
            tracing::info!(%instrument, "Instrument added to watch");
        }

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let outcome = state.fetch_one(instrument).await;
            state.settle_connectivity(outcome.produced_quote());
            outcome == FetchOutcome::Stored
        })
    }

    /// Stop watching an instrument and evict its rate synchronously.
    ///
    /// Returns `true` if it was watched. `QuoteRemoved` is published only
    /// when the instrument was watched or had a cached rate.
    pub fn remove_instrument(&self, instrument: Instrument) -> bool {
        let removal = self.state.registry.remove(instrument);
        if !removal.changed() {
            tracing::debug!(%instrument, "Instrument was not watched");
            return false;
        }

        metrics::set_watched_instruments(self.state.registry.len());
        tracing::info!(%instrument, was_watched = removal.was_watched, "Instrument removed from watch");
        self.state.events.send(RateEvent::QuoteRemoved { instrument });
        removal.was_watched
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> RateSnapshot {
        let status = self.state.status.lock();
        RateSnapshot {
            rates: self.state.registry.rates().snapshot().into_iter().collect(),
            watched: self.state.registry.watched(),
            connectivity: self.state.monitor.state(),
            last_updated: status.last_updated,
            is_loading: status.is_loading,
            error_message: status.error_message.clone(),
            streaming: self.is_streaming(),
        }
    }

    /// Subscribe to rate events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RateEvent> {
        self.state.events.subscribe()
    }

    /// Whether a polling timer is active.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Current connectivity.
    #[must_use]
    pub fn connectivity(&self) -> ConnectivityState {
        self.state.monitor.state()
    }

    /// Connection monitor.
    #[must_use]
    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.state.monitor
    }

    /// Latest quote for an instrument.
    #[must_use]
    pub fn rate(&self, instrument: Instrument) -> Option<Quote> {
        self.state.registry.rates().get(instrument)
    }

    /// Watched instruments in enumeration order.
    #[must_use]
    pub fn watched(&self) -> Vec<Instrument> {
        self.state.registry.watched()
    }

    /// Instruments that are not watched, in enumeration order.
    #[must_use]
    pub fn available(&self) -> Vec<Instrument> {
        self.state.registry.available()
    }

    /// Time of the most recent successful fetch.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.status.lock().last_updated
    }

    /// Whether the first cycle after `start` is pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.status.lock().is_loading
    }

    /// Aggregate error of the last cycle.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.state.status.lock().error_message.clone()
    }
}

impl Drop for RateAggregator {
    fn drop(&mut self) {
        if let Some(token) = self.timer.get_mut().take() {
            token.cancel();
        }
    }
}

impl std::fmt::Debug for RateAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateAggregator")
            .field("config", &self.config)
            .field("watched", &self.state.registry.watched())
            .field("connectivity", &self.state.monitor.state())
            .field("streaming", &self.is_streaming())
            .finish_non_exhaustive()
    }
}

async fn run_timer(
    state: Arc<AggregatorState>,
    period: Duration,
    generation: u64,
    cancel: CancellationToken,
) {
    let in_flight = Arc::new(AtomicBool::new(false));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if in_flight.swap(true, Ordering::AcqRel) {
                    metrics::record_cycle_skipped();
                    tracing::debug!("Previous cycle still running, skipping tick");
                    continue;
                }

                let state = Arc::clone(&state);
                let in_flight = Arc::clone(&in_flight);
                tokio::spawn(async move {
                    state.run_cycle(Some(generation)).await;
                    in_flight.store(false, Ordering::Release);
                });
            }
        }
    }

    tracing::debug!("Polling timer cancelled");
}

// =============================================================================
// Tests
// =============================================================================
