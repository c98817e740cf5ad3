//! Broadcast Channel Adapters
//!
//! Publishes rate streaming events to any number of presentation
//! subscribers using a tokio broadcast channel.
//!
//! # Architecture
//!
//! The `RateEventHub` carries one channel of [`RateEvent`]s. Receivers that
//! fall behind lose the oldest events and can recover by reading a fresh
//! snapshot from the aggregator.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::connectivity::ConnectivityState;
use crate::domain::instrument::Instrument;
use crate::domain::quote::Quote;

// =============================================================================
// Events
// =============================================================================

/// State change published by the rate aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateEvent {
    /// A fresh quote was stored for an instrument.
    QuoteUpdated {
        /// Instrument the quote belongs to.
        instrument: Instrument,
        /// The stored quote.
        quote: Quote,
    },
    /// An instrument's rate was evicted.
    QuoteRemoved {
        /// Evicted instrument.
        instrument: Instrument,
    },
    /// Connectivity changed.
    ConnectivityChanged(ConnectivityState),
    /// A polling cycle finished.
    CycleCompleted {
        /// Fetches that produced a quote.
        succeeded: usize,
        /// Fetches that failed.
        failed: usize,
        /// Aggregate error after the cycle, if any.
        error_message: Option<String>,
    },
    /// Streaming started (or restarted) for a watched set.
    StreamingStarted {
        /// Watched instruments.
        instruments: Vec<Instrument>,
    },
    /// Streaming stopped.
    StreamingStopped,
}

// =============================================================================
// Event Hub
// =============================================================================

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1_024;

/// Fan-out hub for rate events.
#[derive(Debug)]
pub struct RateEventHub {
    events_tx: broadcast::Sender<RateEvent>,
}

impl RateEventHub {
    /// Create a hub with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            events_tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Create a hub with the default capacity.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event, or `None`
    /// if there are no active receivers.
    pub fn send(&self, event: RateEvent) -> Option<usize> {
        self.events_tx.send(event).ok()
    }

    /// Get a new receiver for rate events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RateEvent> {
        self.events_tx.subscribe()
    }

    /// Get the number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.events_tx.receiver_count()
    }
}

impl Default for RateEventHub {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Shared event hub reference.
pub type SharedRateEventHub = Arc<RateEventHub>;

// =============================================================================
// Tests
// =============================================================================
