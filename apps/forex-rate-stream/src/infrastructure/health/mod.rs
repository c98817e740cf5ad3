//! Health, Metrics and Rate Snapshot HTTP Server
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /health` | JSON status; 503 when disconnected with no rates |
//! | `GET /healthz` | Liveness, always 200 |
//! | `GET /readyz` | 200 while the quote service is connected |
//! | `GET /metrics` | Prometheus text exposition |
//! | `GET /rates` | JSON [`RateSnapshot`](crate::application::services::RateSnapshot) |

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::RateAggregator;
use crate::domain::connectivity::ConnectivityState;
use crate::infrastructure::broadcast::SharedRateEventHub;
use crate::infrastructure::metrics::get_metrics_handle;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

// =============================================================================
// Health Response Types
// =============================================================================

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Derived service status.
    pub status: HealthStatus,
    /// Crate version.
    pub version: String,
    /// Seconds since the server state was created.
    pub uptime_secs: u64,
    /// Response time.
    pub current_time: DateTime<Utc>,
    /// Quote service connectivity.
    pub connectivity: ConnectivityInfo,
    /// Polling state.
    pub streaming: StreamingInfo,
    /// Active rate event subscribers.
    pub subscribers: usize,
}

/// Service status derived from connectivity and cached rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Quote service reachable.
    Healthy,
    /// Connecting, or disconnected while older rates are still served.
    Degraded,
    /// Disconnected with nothing to serve.
    Unhealthy,
}

/// Quote service connectivity.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityInfo {
    /// Connectivity state.
    pub state: ConnectivityState,
    /// Last time a request was answered with HTTP 200.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Failed completions in a row.
    pub consecutive_failures: u32,
}

/// Polling state.
#[derive(Debug, Clone, Serialize)]
pub struct StreamingInfo {
    /// Whether a polling timer is active.
    pub active: bool,
    /// Watched instrument count.
    pub watched: usize,
    /// Instruments with a rate.
    pub rates: usize,
    /// Whether the first cycle is pending.
    pub is_loading: bool,
    /// Time of the most recent successful fetch.
    pub last_updated: Option<DateTime<Utc>>,
    /// Aggregate error.
    pub error_message: Option<String>,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Read-only handles the routes report from.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    aggregator: Arc<RateAggregator>,
    events: SharedRateEventHub,
}

impl HealthServerState {
    /// Bundle the aggregator and event hub for the routes.
    #[must_use]
    pub fn new(version: String, aggregator: Arc<RateAggregator>, events: SharedRateEventHub) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            aggregator,
            events,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// HTTP server for health probes, metrics and rate snapshots.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a server bound to `0.0.0.0:port` once run.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Serve until the cancellation token fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound or serving fails.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP status server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!(port = self.port, "HTTP status server stopped");
        Ok(())
    }
}

/// Routes served by [`HealthServer`].
#[must_use]
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .route("/rates", get(rates_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let body = build_health_response(&state);
    let code = if body.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(body))
}

async fn liveness_handler() -> &'static str {
    "ok"
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.aggregator.connectivity() == ConnectivityState::Connected {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "quote service not connected")
    }
}

async fn metrics_handler() -> Response {
    let Some(handle) = get_metrics_handle() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response();
    };
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        handle.render(),
    )
        .into_response()
}

async fn rates_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    Json(state.aggregator.snapshot())
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let snapshot = state.aggregator.snapshot();
    let monitor = state.aggregator.monitor();

    HealthResponse {
        status: determine_health_status(snapshot.connectivity, snapshot.rates.len()),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        connectivity: ConnectivityInfo {
            state: snapshot.connectivity,
            last_connected_at: monitor.last_connected_at(),
            consecutive_failures: monitor.consecutive_failures(),
        },
        streaming: StreamingInfo {
            active: snapshot.streaming,
            watched: snapshot.watched.len(),
            rates: snapshot.rates.len(),
            is_loading: snapshot.is_loading,
            last_updated: snapshot.last_updated,
            error_message: snapshot.error_message,
        },
        subscribers: state.events.receiver_count(),
    }
}

const fn determine_health_status(connectivity: ConnectivityState, rates: usize) -> HealthStatus {
    match connectivity {
        ConnectivityState::Connected => HealthStatus::Healthy,
        ConnectivityState::Connecting => HealthStatus::Degraded,
        ConnectivityState::Disconnected if rates > 0 => HealthStatus::Degraded,
        ConnectivityState::Disconnected => HealthStatus::Unhealthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Status server failure.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Port could not be bound.
    #[error("cannot bind status server to port {0}: {1}")]
    BindFailed(u16, String),

    /// Serving stopped with an error.
    #[error("status server failed: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
