// Provider connection settings

use std::{env, fmt::Display, str::FromStr};
use thiserror::Error;
use tracing::{info, warn};

use crate::search::DEFAULT_MAX_RESULTS;

pub const DEFAULT_BASE_URL: &str = "https://test.api.amadeus.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
// Refresh a cached token this long before the provider says it expires
pub const TOKEN_EXPIRY_MARGIN_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_ms: u64,
    pub max_results: u32,
    pub token_expiry_margin_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_results: DEFAULT_MAX_RESULTS,
            token_expiry_margin_secs: TOKEN_EXPIRY_MARGIN_SECS,
        }
    }
}

// Credentials stay out of debug output
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("max_results", &self.max_results)
            .field("token_expiry_margin_secs", &self.token_expiry_margin_secs)
            .finish()
    }
}

impl ClientConfig {
    pub fn with_credentials(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Default::default()
        }
    }

    // Loads settings from `AMADEUS_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            base_url: optional(&lookup, "AMADEUS_BASE_URL", DEFAULT_BASE_URL.to_string())?
                .trim_end_matches('/')
                .to_string(),
            client_id: required(&lookup, "AMADEUS_CLIENT_ID")?,
            client_secret: required(&lookup, "AMADEUS_CLIENT_SECRET")?,
            timeout_ms: optional(&lookup, "AMADEUS_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            max_results: optional(&lookup, "AMADEUS_MAX_RESULTS", DEFAULT_MAX_RESULTS)?,
            token_expiry_margin_secs: TOKEN_EXPIRY_MARGIN_SECS,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.is_empty() {
            return Err(ClientError::ConfigError("base URL is empty".to_string()));
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ClientError::ConfigError(
                "client credentials are missing".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ClientError::ConfigError(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_results == 0 {
            return Err(ClientError::ConfigError(
                "max results must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_string()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => {
            warn!("Environment variable {key} not found");
            Err(ClientError::ConfigError(format!("{key} must be set")))
        }
    }
}

fn optional<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ClientError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            ClientError::ConfigError(format!("invalid {key}: {e}"))
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
