//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (quote source, watchlist store).
pub mod ports;

/// Application services for rate streaming and watchlist management.
pub mod services;
