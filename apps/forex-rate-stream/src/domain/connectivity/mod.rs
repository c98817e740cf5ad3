//! Connectivity Tracking
//!
//! Tri-state connectivity signal derived from the outcomes of quote
//! requests. Only a request that produced a usable quote counts as
//! connected. A polling cycle settles the state once, after all of its
//! requests finished.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Connection state to the quote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// Last settled request or cycle produced a quote.
    Connected,
    /// A request is in flight.
    Connecting,
    /// Last settled request or cycle failed, or nothing has settled yet.
    #[default]
    Disconnected,
}

impl ConnectivityState {
    /// State name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Connecting => "connecting",
            Self::Disconnected => "disconnected",
        }
    }

    /// Numeric encoding for gauges.
    #[must_use]
    pub const fn as_gauge(self) -> f64 {
        match self {
            Self::Disconnected => 0.0,
            Self::Connecting => 1.0,
            Self::Connected => 2.0,
        }
    }
}

/// Tracks connectivity across concurrent quote requests.
///
/// Every request marks the monitor `connecting` before it is sent. The
/// outcome is recorded once per polling cycle, or once per standalone
/// request, so a late failure cannot hide a success in the same cycle.
#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    state: RwLock<ConnectivityState>,
    last_connected_at: RwLock<Option<DateTime<Utc>>>,
    consecutive_failures: AtomicU32,
}

impl ConnectionMonitor {
    /// Create a monitor in the `disconnected` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectivityState {
        *self.state.read()
    }

    /// Whether the last settled outcome produced a quote.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectivityState::Connected
    }

    /// When the monitor last transitioned to or confirmed `connected`.
    #[must_use]
    pub fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        *self.last_connected_at.read()
    }

    /// Settled outcomes in a row that produced no quote.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Mark a request as in flight.
    ///
    /// Returns the new state if it changed.
    pub fn begin_request(&self) -> Option<ConnectivityState> {
        self.transition(ConnectivityState::Connecting)
    }

    /// Settle the outcome of a cycle or a standalone request.
    ///
    /// `connected` is true when at least one request produced a quote.
    /// Returns the new state if it changed.
    pub fn record_completion(&self, connected: bool) -> Option<ConnectivityState> {
        if connected {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            *self.last_connected_at.write() = Some(Utc::now());
            self.transition(ConnectivityState::Connected)
        } else {
            self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
            self.transition(ConnectivityState::Disconnected)
        }
    }

    fn transition(&self, next: ConnectivityState) -> Option<ConnectivityState> {
        let mut state = self.state.write();
        if *state == next {
            return None;
        }
        *state = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        let monitor = ConnectionMonitor::new();
        assert_eq!(monitor.state(), ConnectivityState::Disconnected);
        assert!(monitor.last_connected_at().is_none());
    }

    #[test]
    fn request_lifecycle_success() {
        let monitor = ConnectionMonitor::new();
        assert_eq!(monitor.begin_request(), Some(ConnectivityState::Connecting));
        assert_eq!(
            monitor.record_completion(true),
            Some(ConnectivityState::Connected)
        );
        assert!(monitor.is_connected());
        assert!(monitor.last_connected_at().is_some());
    }

    #[test]
    fn failure_disconnects_and_counts() {
        let monitor = ConnectionMonitor::new();
        monitor.begin_request();
        monitor.record_completion(false);
        monitor.begin_request();
        monitor.record_completion(false);
        assert_eq!(monitor.state(), ConnectivityState::Disconnected);
        assert_eq!(monitor.consecutive_failures(), 2);

        monitor.record_completion(true);
        assert_eq!(monitor.consecutive_failures(), 0);
    }

    #[test]
    fn unchanged_state_reports_no_transition() {
        let monitor = ConnectionMonitor::new();
        assert_eq!(monitor.record_completion(false), None);
        monitor.record_completion(true);
        assert_eq!(monitor.record_completion(true), None);
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConnectivityState::Connecting).unwrap(),
            "\"connecting\""
        );
    }
}
