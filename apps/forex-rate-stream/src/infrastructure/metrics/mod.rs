//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Fetches**: Quote requests by instrument and outcome
//! - **Cycles**: Completed and skipped polling cycles, cycle latency
//! - **State**: Watched instrument count and connectivity
//! - **Persistence**: Watchlist save failures
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;

use crate::domain::connectivity::ConnectivityState;
use crate::domain::instrument::Instrument;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static INSTALL_LOCK: Mutex<()> = Mutex::new(());

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the already installed handle.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let _install = INSTALL_LOCK.lock();
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "forex_stream_fetches_total",
        "Total quote requests by instrument and outcome"
    );
    describe_counter!(
        "forex_stream_cycles_total",
        "Total polling cycles completed"
    );
    describe_counter!(
        "forex_stream_cycles_skipped_total",
        "Timer ticks skipped because a cycle was still running"
    );
    describe_counter!(
        "forex_stream_store_failures_total",
        "Total watchlist persistence failures"
    );

    describe_gauge!(
        "forex_stream_watched_instruments",
        "Number of instruments in the watched set"
    );
    describe_gauge!(
        "forex_stream_connectivity",
        "Connectivity state (0 = disconnected, 1 = connecting, 2 = connected)"
    );

    describe_histogram!(
        "forex_stream_cycle_duration_seconds",
        "Time from cycle start until every fetch completed"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a finished quote request.
///
/// `outcome` is `"ok"` or the error kind.
pub fn record_fetch(instrument: Instrument, outcome: &'static str) {
    counter!(
        "forex_stream_fetches_total",
        "instrument" => instrument.api_symbol(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a completed polling cycle.
pub fn record_cycle(duration: Duration) {
    counter!("forex_stream_cycles_total").increment(1);
    histogram!("forex_stream_cycle_duration_seconds").record(duration.as_secs_f64());
}

/// Record a timer tick skipped while a cycle was in flight.
pub fn record_cycle_skipped() {
    counter!("forex_stream_cycles_skipped_total").increment(1);
}

/// Record a watchlist persistence failure.
pub fn record_store_failure(operation: &'static str) {
    counter!(
        "forex_stream_store_failures_total",
        "operation" => operation
    )
    .increment(1);
}

/// Update the watched instrument count.
#[allow(clippy::cast_precision_loss)]
pub fn set_watched_instruments(count: usize) {
    gauge!("forex_stream_watched_instruments").set(count as f64);
}

/// Update the connectivity gauge.
pub fn set_connectivity(state: ConnectivityState) {
    gauge!("forex_stream_connectivity").set(state.as_gauge());
}

// =============================================================================
// Tests
// =============================================================================
