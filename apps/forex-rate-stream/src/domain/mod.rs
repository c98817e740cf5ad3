//! Domain Layer - Core watchlist types and business rules.
//!
//! This layer contains the instrument catalogue, quote values, connectivity
//! tracking and watch bookkeeping. Nothing here performs I/O.

/// Currencies and the closed set of tradable pairs.
pub mod instrument;

/// Quote snapshot and derived values.
pub mod quote;

/// Connectivity state derived from request outcomes.
pub mod connectivity;

/// Watched instrument set and rate table.
pub mod registry;

/// Persisted watchlist entries and list operations.
pub mod watchlist;
