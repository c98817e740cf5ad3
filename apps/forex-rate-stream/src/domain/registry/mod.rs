//! Watched Instruments and Rate Table
//!
//! Tracks which instruments are polled and the most recent quote for each.
//!
//! # Design
//!
//! The registry owns the watched set and shares the rate table with the
//! aggregator. Unwatching an instrument evicts its rate in the same call so
//! a removed pair never reappears from a stale table entry.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::instrument::Instrument;
use crate::domain::quote::Quote;

// =============================================================================
// Rate Table
// =============================================================================

/// Instrument to most recent quote.
#[derive(Debug, Default)]
pub struct RateTable {
    rates: RwLock<BTreeMap<Instrument, Quote>>,
}

impl RateTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the quote for an instrument.
    pub fn upsert(&self, instrument: Instrument, quote: Quote) {
        self.rates.write().insert(instrument, quote);
    }

    /// Remove an instrument's quote.
    ///
    /// Returns the evicted quote, if any.
    pub fn evict(&self, instrument: Instrument) -> Option<Quote> {
        self.rates.write().remove(&instrument)
    }

    /// Quote for one instrument.
    #[must_use]
    pub fn get(&self, instrument: Instrument) -> Option<Quote> {
        self.rates.read().get(&instrument).cloned()
    }

    /// Copy of all rates in enumeration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Instrument, Quote)> {
        self.rates
            .read()
            .iter()
            .map(|(i, q)| (*i, q.clone()))
            .collect()
    }

    /// Number of instruments with a quote.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.read().len()
    }

    /// Whether no instrument has a quote.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.read().is_empty()
    }
}

// =============================================================================
// Watch Registry
// =============================================================================

/// Result of [`WatchRegistry::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// The instrument was in the watched set.
    pub was_watched: bool,
    /// A cached rate was evicted.
    pub evicted: bool,
}

impl Removal {
    /// Whether the call changed anything observable.
    #[must_use]
    pub const fn changed(self) -> bool {
        self.was_watched || self.evicted
    }
}

/// Set of instruments included in each polling cycle.
#[derive(Debug)]
pub struct WatchRegistry {
    watched: RwLock<BTreeSet<Instrument>>,
    rates: Arc<RateTable>,
}

impl WatchRegistry {
    /// Create an empty registry bound to a rate table.
    #[must_use]
    pub fn new(rates: Arc<RateTable>) -> Self {
        Self {
            watched: RwLock::new(BTreeSet::new()),
            rates,
        }
    }

    /// Replace the watched set wholesale.
    ///
    /// Rates of instruments that are no longer watched are left in the
    /// table until explicitly removed.
    pub fn set_watched(&self, instruments: impl IntoIterator<Item = Instrument>) {
        *self.watched.write() = instruments.into_iter().collect();
    }

    /// Start watching an instrument.
    ///
    /// Returns `true` if it was not already watched.
    pub fn add(&self, instrument: Instrument) -> bool {
        self.watched.write().insert(instrument)
    }

    /// Stop watching an instrument and evict its rate.
    pub fn remove(&self, instrument: Instrument) -> Removal {
        let was_watched = self.watched.write().remove(&instrument);
        let evicted = self.rates.evict(instrument).is_some();
        Removal {
            was_watched,
            evicted,
        }
    }

    /// Whether an instrument is watched.
    #[must_use]
    pub fn contains(&self, instrument: Instrument) -> bool {
        self.watched.read().contains(&instrument)
    }

    /// Watched instruments in enumeration order.
    #[must_use]
    pub fn watched(&self) -> Vec<Instrument> {
        self.watched.read().iter().copied().collect()
    }

    /// Number of watched instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.watched.read().len()
    }

    /// Whether nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watched.read().is_empty()
    }

    /// Instruments that could still be added, in enumeration order.
    #[must_use]
    pub fn available(&self) -> Vec<Instrument> {
        Instrument::available(self.watched.read().iter())
    }

    /// Shared rate table.
    #[must_use]
    pub const fn rates(&self) -> &Arc<RateTable> {
        &self.rates
    }
}

// =============================================================================
// Tests
// =============================================================================
