//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// HTTP client for the forex quote service.
pub mod quote_client;

/// Watchlist storage adapters.
pub mod persistence;

/// Broadcast channel for rate events.
pub mod broadcast;

/// Configuration loading.
pub mod config;

/// Health check and rate snapshot HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
