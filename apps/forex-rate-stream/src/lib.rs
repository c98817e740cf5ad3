#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Forex Rate Stream - Watchlist Quote Aggregator
//!
//! Polls a REST quote service for a dynamic set of currency pairs, merges
//! the answers into a shared rate table and tracks whether the service is
//! reachable. Presentation layers read snapshots or subscribe to events.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `instrument`: Supported currencies and pairs
//!   - `quote`: Quote records and derived spread values
//!   - `connectivity`: Connectivity state machine
//!   - `registry`: Watched set and rate table
//!   - `watchlist`: Persisted watchlist entries and ordering
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Quote source and watchlist repository interfaces
//!   - `services`: Rate aggregation, watchlist management
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `quote_client`: HTTP quote source
//!   - `persistence`: JSON file and in-memory watchlist stores
//!   - `broadcast`: Rate event distribution
//!   - `config`: Environment configuration
//!   - `health`: Health, metrics and snapshot HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//!                 ┌─────────────┐  fan-out   ┌─────────────┐
//!   timer tick ──►│ Aggregator  │───────────►│ Quote API   │
//!                 │             │◄───────────│ (per pair)  │
//!                 └──────┬──────┘  join      └─────────────┘
//!                        │
//!            ┌───────────┼────────────┐
//!            ▼           ▼            ▼
//!       Rate table   Connectivity   Event hub ──► subscribers
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core rate types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connectivity::{ConnectionMonitor, ConnectivityState};
pub use domain::instrument::{Currency, Instrument, UnknownInstrument};
pub use domain::quote::Quote;
pub use domain::watchlist::WatchEntry;

// Ports
pub use application::ports::{QuoteError, QuoteSource, StoreError, WatchlistRepository};

// Services
pub use application::services::{
    AggregatorConfig, FETCH_FAILED_MESSAGE, RateAggregator, RateSnapshot, WatchlistService,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, ServiceConfig};

// Adapters
pub use infrastructure::persistence::{InMemoryWatchlistRepository, JsonFileWatchlistRepository};
pub use infrastructure::quote_client::HttpQuoteClient;

// Broadcast hub
pub use infrastructure::broadcast::{RateEvent, RateEventHub, SharedRateEventHub};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
