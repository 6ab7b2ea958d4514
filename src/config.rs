//! Agent configuration loading.
//!
//! Configuration comes from a YAML file with environment variable
//! overrides. The one option with algorithmic effect is
//! `broker_global_max_size`: when present and positive it takes
//! precedence over querying the broker's capacity asynchronously.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, Result, SyncError};
use crate::size::parse_to_bytes;

/// Environment variable overriding the configured global capacity.
const GLOBAL_MAX_SIZE_ENV: &str = "BROKER_GLOBAL_MAX_SIZE";

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Statically configured broker capacity as a human-readable size
    /// string (e.g. `"4Gb"`). Unset or unparseable means "query the
    /// broker instead".
    pub broker_global_max_size: Option<String>,
    /// Sync loop tuning.
    pub sync: SyncTuning,
}

/// Tuning knobs for the sync loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncTuning {
    /// Quiet period before a coalesced sync fires, in milliseconds.
    pub min_delay_ms: u64,
    /// Upper bound on coalescing latency, in milliseconds.
    pub max_delay_ms: u64,
    /// Delay before retrying a failed sync cycle, in milliseconds.
    /// Zero disables retries.
    pub retry_delay_ms: u64,
    /// Maximum number of addresses per management batch.
    pub chunk_size: usize,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            min_delay_ms: 500,
            max_delay_ms: 5_000,
            retry_delay_ms: 10_000,
            chunk_size: 25,
        }
    }
}

impl SyncTuning {
    /// Quiet period as a [`Duration`].
    #[must_use]
    pub const fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    /// Latency bound as a [`Duration`].
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Retry delay, or `None` when retries are disabled.
    #[must_use]
    pub const fn retry_delay(&self) -> Option<Duration> {
        if self.retry_delay_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.retry_delay_ms))
        }
    }
}

impl AgentConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(SyncError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        Self::parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(content: &str, source: Option<&Path>) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| {
            SyncError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration with environment variable overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var(GLOBAL_MAX_SIZE_ENV) {
            debug!("Overriding broker_global_max_size from environment");
            self.broker_global_max_size = Some(size);
        }
    }

    /// The configured global capacity in bytes, 0 when unset or
    /// unparseable.
    #[must_use]
    pub fn global_max_size_bytes(&self) -> u64 {
        self.broker_global_max_size
            .as_deref()
            .map_or(0, parse_to_bytes)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error for inconsistent tuning values.
    pub fn validate(&self) -> Result<()> {
        if self.sync.max_delay_ms < self.sync.min_delay_ms {
            return Err(SyncError::Config(ConfigError::ValidationError {
                message: format!(
                    "sync.max_delay_ms ({}) must not be less than sync.min_delay_ms ({})",
                    self.sync.max_delay_ms, self.sync.min_delay_ms
                ),
            }));
        }
        if self.sync.chunk_size == 0 {
            return Err(SyncError::Config(ConfigError::ValidationError {
                message: String::from("sync.chunk_size must be positive"),
            }));
        }
        Ok(())
    }
}
