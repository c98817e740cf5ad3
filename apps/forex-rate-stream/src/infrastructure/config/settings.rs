//! Service Configuration Settings
//!
//! Configuration types for the rate stream, loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::instrument::{Instrument, UnknownInstrument};

/// API token for the quote service.
#[derive(Clone, Default)]
pub struct ApiToken(Option<String>);

impl ApiToken {
    /// Wrap an optional token. Empty strings count as missing.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.is_empty()))
    }

    /// Get the token value.
    #[must_use]
    pub fn expose(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Whether a token is configured.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_some() {
            f.write_str("ApiToken([REDACTED])")
        } else {
            f.write_str("ApiToken(None)")
        }
    }
}

/// Quote service connection settings.
#[derive(Debug, Clone)]
pub struct QuoteServiceSettings {
    /// Service base URL.
    pub base_url: Option<String>,
    /// API token sent in the `token` header.
    pub token: ApiToken,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for QuoteServiceSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            token: ApiToken::default(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Polling and event settings.
#[derive(Debug, Clone)]
pub struct StreamingSettings {
    /// Time between polling cycles.
    pub poll_interval: Duration,
    /// Capacity of the rate event channel.
    pub event_capacity: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            event_capacity: 1_024,
        }
    }
}

/// Watchlist storage settings.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Path of the JSON watchlist file.
    pub watchlist_path: PathBuf,
    /// Instruments added when the stored watchlist is empty.
    pub seed: Vec<Instrument>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            watchlist_path: PathBuf::from("watchlist.json"),
            seed: Vec::new(),
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Health, metrics and snapshot HTTP port (0 = disabled).
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Quote service connection.
    pub quote_service: QuoteServiceSettings,
    /// Polling and events.
    pub streaming: StreamingSettings,
    /// Watchlist storage.
    pub storage: StorageSettings,
    /// Server ports.
    pub server: ServerSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// A missing base URL or token is not an error; see
    /// [`ServiceConfig::missing_settings`].
    ///
    /// # Errors
    ///
    /// Returns an error if the watchlist seed names an unsupported pair.
    pub fn from_env() -> Result<Self, ConfigError> {
        let quote_service = QuoteServiceSettings {
            base_url: non_empty_env("FOREX_BASE_URL"),
            token: ApiToken::new(non_empty_env("FOREX_API_TOKEN")),
            request_timeout: parse_env_duration_secs(
                "FOREX_REQUEST_TIMEOUT_SECS",
                QuoteServiceSettings::default().request_timeout,
            ),
        };

        let streaming = StreamingSettings {
            poll_interval: parse_env_duration_secs(
                "FOREX_POLL_INTERVAL_SECS",
                StreamingSettings::default().poll_interval,
            ),
            event_capacity: parse_env_usize(
                "FOREX_EVENT_CAPACITY",
                StreamingSettings::default().event_capacity,
            ),
        };

        let storage = StorageSettings {
            watchlist_path: non_empty_env("FOREX_WATCHLIST_PATH")
                .map_or_else(|| StorageSettings::default().watchlist_path, PathBuf::from),
            seed: non_empty_env("FOREX_WATCHLIST_SEED")
                .map(|raw| parse_seed(&raw))
                .transpose()?
                .unwrap_or_default(),
        };

        let server = ServerSettings {
            health_port: parse_env_u16("FOREX_HEALTH_PORT", ServerSettings::default().health_port),
        };

        Ok(Self {
            quote_service,
            streaming,
            storage,
            server,
        })
    }

    /// Names of settings the quote service needs but that are not set.
    #[must_use]
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.quote_service.base_url.is_none() {
            missing.push("FOREX_BASE_URL");
        }
        if !self.quote_service.token.is_set() {
            missing.push("FOREX_API_TOKEN");
        }
        missing
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Seed list contains an unsupported pair.
    #[error("invalid FOREX_WATCHLIST_SEED: {0}")]
    InvalidSeed(#[from] UnknownInstrument),
}

/// Parse a comma-separated instrument list (`USD/JPY, EUR/USD`).
///
/// # Errors
///
/// Returns an error naming the first unsupported pair.
pub fn parse_seed(raw: &str) -> Result<Vec<Instrument>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Instrument>().map_err(ConfigError::from))
        .collect()
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map_or(default, Duration::from_secs)
}
