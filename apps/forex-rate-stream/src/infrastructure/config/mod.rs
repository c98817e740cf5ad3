//! Configuration Module
//!
//! Configuration loading for the rate stream service.

mod settings;

pub use settings::{
    ApiToken, ConfigError, QuoteServiceSettings, ServerSettings, ServiceConfig, StorageSettings,
    StreamingSettings, parse_seed,
};
