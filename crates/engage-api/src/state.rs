//! # Application State
//!
//! Shared state for the Axum application: the marketplace handle and the
//! server configuration.

use std::sync::Arc;

use engage_engine::{ConfigError, EngineConfig, Marketplace};

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub port: u16,
    pub log_format: LogFormat,
    /// Shared secret the payment webhook must present in
    /// `x-webhook-secret`. `None` accepts unsigned calls.
    pub webhook_secret: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_format: LogFormat::Pretty,
            webhook_secret: None,
        }
    }
}

impl ApiConfig {
    /// Read `ENGAGE_API_PORT`, `ENGAGE_LOG_FORMAT` and
    /// `ENGAGE_WEBHOOK_SECRET`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup("ENGAGE_API_PORT") {
            config.port = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("ENGAGE_API_PORT".into(), raw.clone()))?;
        }
        if let Some(raw) = lookup("ENGAGE_LOG_FORMAT") {
            config.log_format = match raw.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                _ => return Err(ConfigError::Invalid("ENGAGE_LOG_FORMAT".into(), raw)),
            };
        }
        config.webhook_secret = lookup("ENGAGE_WEBHOOK_SECRET").filter(|s| !s.is_empty());
        Ok(config)
    }
}

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub market: Marketplace,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    /// In-memory marketplace with default engine and server configuration.
    pub fn new() -> Self {
        Self::with_market(
            Marketplace::in_memory(EngineConfig::default()),
            ApiConfig::default(),
        )
    }

    pub fn with_market(market: Marketplace, config: ApiConfig) -> Self {
        Self {
            market,
            config: Arc::new(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
