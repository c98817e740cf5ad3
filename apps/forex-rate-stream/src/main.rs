//! Forex Rate Stream Binary
//!
//! Loads the stored watchlist and polls the quote service for its active
//! pairs until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin forex-rate-stream
//! ```
//!
//! # Environment Variables
//!
//! ## Required for live quotes
//! - `FOREX_BASE_URL`: Quote service base URL
//! - `FOREX_API_TOKEN`: Quote service token
//!
//! ## Optional
//! - `FOREX_POLL_INTERVAL_SECS`: Seconds between cycles (default: 5)
//! - `FOREX_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 10)
//! - `FOREX_EVENT_CAPACITY`: Rate event buffer per subscriber (default: 1024)
//! - `FOREX_HEALTH_PORT`: Health/metrics/snapshot HTTP port, 0 disables (default: 8083)
//! - `FOREX_WATCHLIST_PATH`: Watchlist file (default: watchlist.json)
//! - `FOREX_WATCHLIST_SEED`: Pairs added when the stored watchlist is empty
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: forex-rate-stream)
//! - `RUST_LOG`: Log filter (default: info)

use std::sync::Arc;

use forex_rate_stream::infrastructure::broadcast::RateEventHub;
use forex_rate_stream::infrastructure::health::{HealthServer, HealthServerState};
use forex_rate_stream::infrastructure::telemetry;
use forex_rate_stream::{
    AggregatorConfig, HttpQuoteClient, JsonFileWatchlistRepository, RateAggregator, RateEvent,
    ServiceConfig, WatchlistService, init_metrics,
};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    load_dotenv();

    // Initialize telemetry (tracing + optional OTLP)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Forex Rate Stream");
    if !provider_installed {
        tracing::debug!("rustls crypto provider already installed");
    }

    // Initialize Prometheus metrics
    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Prometheus recorder unavailable, metrics disabled");
    }

    let config = ServiceConfig::from_env()?;
    log_config(&config);

    let missing = config.missing_settings();
    if !missing.is_empty() {
        tracing::warn!(
            missing = ?missing,
            "Quote service settings missing, requests will fail"
        );
    }

    let shutdown_token = CancellationToken::new();

    let events = Arc::new(RateEventHub::new(config.streaming.event_capacity));
    let client = HttpQuoteClient::new(&config.quote_service)?;
    let aggregator = Arc::new(RateAggregator::new(
        Arc::new(client),
        Arc::clone(&events),
        AggregatorConfig {
            poll_interval: config.streaming.poll_interval,
        },
    ));

    let repository = Arc::new(JsonFileWatchlistRepository::new(
        config.storage.watchlist_path.clone(),
    ));
    let watchlist = WatchlistService::load(repository, Arc::clone(&aggregator)).await?;

    if watchlist.entries().await.is_empty() && !config.storage.seed.is_empty() {
        let added = watchlist.add_instruments(&config.storage.seed).await;
        tracing::info!(count = added.len(), "Seeded empty watchlist");
    }

    // Spawn event logger
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Spawn health server
    if config.server.health_port > 0 {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            Arc::clone(&aggregator),
            Arc::clone(&events),
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            shutdown_token.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    watchlist.start_streaming().await;
    tracing::info!("Rate stream ready");

    await_shutdown(shutdown_token).await;
    watchlist.stop_streaming();

    tracing::info!("Rate stream stopped");
    Ok(())
}

fn log_event(event: &RateEvent) {
    match event {
        RateEvent::ConnectivityChanged(state) => {
            tracing::info!(state = state.as_str(), "Connectivity changed");
        }
        RateEvent::CycleCompleted {
            succeeded,
            failed,
            error_message: Some(message),
        } => {
            tracing::warn!(succeeded, failed, error = %message, "Cycle produced no rates");
        }
        RateEvent::QuoteUpdated { instrument, quote } => {
            tracing::debug!(%instrument, price = %quote.price, "Rate");
        }
        _ => {}
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors().skip(1) {
            let env_path = dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        poll_interval_secs = config.streaming.poll_interval.as_secs(),
        request_timeout_secs = config.quote_service.request_timeout.as_secs(),
        health_port = config.server.health_port,
        watchlist_path = %config.storage.watchlist_path.display(),
        seed = config.storage.seed.len(),
        "Configuration loaded"
    );
    tracing::debug!(
        base_url = config.quote_service.base_url.as_deref().unwrap_or("<unset>"),
        token = ?config.quote_service.token,
        "Quote service endpoint"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
