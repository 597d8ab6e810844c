use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::CoreError;

/// Environment variable overriding `backend_url`.
pub const ENV_BACKEND_URL: &str = "FINDASH_BACKEND_URL";
/// Environment variable overriding `api_key`.
pub const ENV_API_KEY: &str = "FINDASH_API_KEY";
/// Environment variable overriding `history_limit`.
pub const ENV_HISTORY_LIMIT: &str = "FINDASH_HISTORY_LIMIT";

/// Runtime configuration for the dashboard core.
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the backend (e.g., "https://project.example.co")
    pub backend_url: String,

    /// Key sent as `apikey` and bearer token on every backend request
    pub api_key: String,

    /// Symbols watched when the user's own watchlist is empty
    pub default_watchlist: Vec<String>,

    /// Maximum number of historical bars fetched per symbol
    pub history_limit: usize,

    /// Capacity of the bounded push-update queue
    pub push_channel_capacity: usize,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// Backoff applied when the push subscription drops
    pub reconnect: ReconnectPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            default_watchlist: ["AAPL", "MSFT", "NVDA", "AMZN", "TSLA"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            history_limit: 30,
            push_channel_capacity: 256,
            request_timeout_secs: 30,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file on disk.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Apply `FINDASH_*` environment overrides on top of the current values.
    pub fn apply_env_overrides(&mut self) -> Result<(), CoreError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::apply_env_overrides`] with an injectable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(limit) = lookup(ENV_HISTORY_LIMIT) {
            self.history_limit = limit.trim().parse().map_err(|_| {
                CoreError::Config(format!("{ENV_HISTORY_LIMIT} must be a positive integer, got {limit:?}"))
            })?;
        }
        self.validate()
    }

    /// Reject values the store cannot operate with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.history_limit == 0 {
            return Err(CoreError::Config("history_limit must be at least 1".into()));
        }
        if self.push_channel_capacity == 0 {
            return Err(CoreError::Config(
                "push_channel_capacity must be at least 1".into(),
            ));
        }
        if self.reconnect.multiplier == 0 {
            return Err(CoreError::Config("reconnect.multiplier must be at least 1".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Exponential backoff for re-establishing the push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            multiplier: 2,
        }
    }
}

impl ReconnectPolicy {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Backoff to use after `current`, capped at `max_backoff_ms`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        let next = current.saturating_mul(self.multiplier.max(1));
        next.min(Duration::from_millis(self.max_backoff_ms))
    }
}
