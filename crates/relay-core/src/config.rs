//! Configuration system using Figment.
//!
//! Configuration is loaded from:
//! 1. `config/relay.toml` (base configuration, optional)
//! 2. Environment variables prefixed with `SENSOR_RELAY_`, using `__` to
//!    descend into sections
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working local setup: ingest on port 8000, consumer polling
//! `http://127.0.0.1:8000` every 100 ms with a 500-sample live window.
//!
//! # Example
//! ```no_run
//! use relay_core::config::RelayConfig;
//!
//! // SENSOR_RELAY_CLIENT__POLL_INTERVAL=50ms overrides client.poll_interval
//! let config = RelayConfig::load()?;
//! config.validate()?;
//! println!("polling every {:?}", config.client.poll_interval);
//! # Ok::<(), relay_core::RelayError>(())
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{RelayError, RelayResult};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SENSOR_RELAY_";

/// Default ingest port.
pub const DEFAULT_PORT: u16 = 8000;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Ingest service settings
    pub server: ServerConfig,
    /// Consumer settings
    pub client: ClientConfig,
    /// Record tag recognition
    pub ingest: IngestConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    pub log_format: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "sensor-relay".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Ingest service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// How the consumer folds each polled snapshot into session history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Append only samples newer than the last one already in history.
    #[default]
    Delta,
    /// Append the whole snapshot on every poll. Reproduces the duplicated
    /// export of earlier consumers; only useful for comparison.
    FullSnapshot,
}

/// Consumer (poll loop) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the ingest service
    pub base_url: String,
    /// Time between ticks
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Upper bound on a single snapshot fetch
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
    /// Live window capacity per channel
    pub window_capacity: usize,
    /// Whether to accumulate session history for export
    pub history: bool,
    /// Accumulation strategy for session history
    pub history_policy: HistoryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://127.0.0.1:{DEFAULT_PORT}"),
            poll_interval: Duration::from_millis(100),
            fetch_timeout: Duration::from_secs(2),
            window_capacity: 500,
            history: true,
            history_policy: HistoryPolicy::Delta,
        }
    }
}

/// Which record `name` tags map to which channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Tags routed to the motion channel
    pub motion_tags: Vec<String>,
    /// Tags routed to the audio channel
    pub audio_tags: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            motion_tags: vec!["wrist motion".to_string()],
            audio_tags: vec!["microphone".to_string()],
        }
    }
}

impl RelayConfig {
    /// Load configuration from `config/relay.toml` and environment variables.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load() -> RelayResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path plus environment overrides.
    pub fn load_from<P: AsRef<Path>>(path: P) -> RelayResult<Self> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(RelayError::from)
    }

    /// Parse configuration from a TOML string, without environment overrides.
    pub fn from_toml_str(toml: &str) -> RelayResult<Self> {
        Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .map_err(RelayError::from)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> RelayResult<()> {
        let level = self.application.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(RelayError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        let format = self.application.log_format.to_lowercase();
        if !VALID_LOG_FORMATS.contains(&format.as_str()) {
            return Err(RelayError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                VALID_LOG_FORMATS.join(", ")
            )));
        }

        if self.client.window_capacity == 0 {
            return Err(RelayError::Configuration(
                "client.window_capacity must be at least 1".to_string(),
            ));
        }

        if self.client.poll_interval.is_zero() {
            return Err(RelayError::Configuration(
                "client.poll_interval must be non-zero".to_string(),
            ));
        }

        if self.client.fetch_timeout < Duration::from_millis(1) {
            return Err(RelayError::Configuration(
                "client.fetch_timeout must be at least 1ms".to_string(),
            ));
        }

        if self.ingest.motion_tags.is_empty() || self.ingest.audio_tags.is_empty() {
            return Err(RelayError::Configuration(
                "ingest.motion_tags and ingest.audio_tags must not be empty".to_string(),
            ));
        }

        if let Some(tag) = self
            .ingest
            .motion_tags
            .iter()
            .find(|tag| self.ingest.audio_tags.contains(tag))
        {
            return Err(RelayError::Configuration(format!(
                "Tag '{tag}' is listed as both motion and audio"
            )));
        }

        Ok(())
    }
}
