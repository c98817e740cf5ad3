//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `QuoteSource`: Fetches the latest quote for one instrument
//! - `WatchlistRepository`: Loads and saves the persisted watchlist

use async_trait::async_trait;

use crate::domain::instrument::Instrument;
use crate::domain::quote::Quote;
use crate::domain::watchlist::WatchEntry;

// =============================================================================
// Quote Source
// =============================================================================

/// Failure of a single quote request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    /// Request URL could not be built.
    #[error("Invalid URL")]
    InvalidUrl,
    /// Service answered with an empty result.
    #[error("No data received from forex service")]
    NoData,
    /// Service answered with a body that could not be decoded.
    #[error("Invalid response format from forex service")]
    InvalidResponse,
    /// Service rejected the request for quota reasons (HTTP 429).
    #[error("API quota exceeded. Please try again later.")]
    QuotaExceeded,
    /// Service reported a server-side failure (HTTP 5xx).
    #[error("Forex service is temporarily unavailable. Please try again later.")]
    ServiceUnavailable,
    /// Transport failure, timeout, or any other non-200 status.
    #[error("Unable to connect to forex service. Please check your internet connection.")]
    ConnectionFailed,
    /// Anything else.
    #[error("{0}")]
    Unknown(String),
}

impl QuoteError {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::NoData => "no_data",
            Self::InvalidResponse => "invalid_response",
            Self::QuotaExceeded => "quota_exceeded",
            Self::ServiceUnavailable => "service_unavailable",
            Self::ConnectionFailed => "connection_failed",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Source of quotes for individual instruments.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the latest quote for an instrument.
    async fn fetch(&self, instrument: Instrument) -> Result<Quote, QuoteError>;
}

// =============================================================================
// Watchlist Repository
// =============================================================================

/// Watchlist persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying storage could not be read or written.
    #[error("storage I/O failed: {0}")]
    Io(String),
    /// Stored data could not be encoded or decoded.
    #[error("storage encoding failed: {0}")]
    Encoding(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encoding(e.to_string())
    }
}

/// Persistent store for watchlist entries.
#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    /// Load all entries, ordered by `order`.
    async fn load(&self) -> Result<Vec<WatchEntry>, StoreError>;

    /// Replace the stored entries.
    async fn save(&self, entries: &[WatchEntry]) -> Result<(), StoreError>;
}
