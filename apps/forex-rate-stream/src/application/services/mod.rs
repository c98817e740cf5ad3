//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `RateAggregator`: Periodic concurrent polling and rate merging
//! - `WatchlistService`: Persisted watchlist kept in step with polling

mod aggregator;
mod watchlist;

pub use aggregator::{
    AggregatorConfig, DEFAULT_POLL_INTERVAL, FETCH_FAILED_MESSAGE, RateAggregator, RateSnapshot,
};
pub use watchlist::WatchlistService;
