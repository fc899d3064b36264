//! Sampler configuration
//!
//! Values come from defaults, then an optional TOML file, then command-line
//! overrides applied by the binary.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{
    DEFAULT_ENUMERATION_CAPACITY, DEFAULT_HISTORY_SLACK, DEFAULT_REFRESH_MS,
    DEFAULT_TOP_CONSUMERS, MAX_REFRESH_MS, MIN_REFRESH_MS,
};
use crate::error::{ConfigError, ConfigResult};

/// Tunables for the sampler and the polling service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// History entries tolerated over the live count before pruning
    pub history_slack: usize,
    /// Upper bound on processes enumerated per poll
    pub enumeration_capacity: usize,
    /// Reset the baseline when a PID's start time changes
    pub detect_identity_reuse: bool,
    /// Polling interval in milliseconds
    pub refresh_interval_ms: u64,
    /// Rows returned by the top memory consumers query
    pub top_consumers: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            history_slack: DEFAULT_HISTORY_SLACK,
            enumeration_capacity: DEFAULT_ENUMERATION_CAPACITY,
            detect_identity_reuse: true,
            refresh_interval_ms: DEFAULT_REFRESH_MS,
            top_consumers: DEFAULT_TOP_CONSUMERS,
        }
    }
}

impl SamplerConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads and validates a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config = Self::from_toml_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        config.validate()?;
        info!("Loaded TOML configuration from: {}", path.display());
        Ok(config)
    }

    /// Loads `path` if given, otherwise `fallback` when it exists, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>, fallback: &Path) -> ConfigResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None if fallback.exists() => Self::load(fallback),
            None => Ok(Self::default()),
        }
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.enumeration_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "enumeration_capacity",
                reason: "must be greater than 0".to_string(),
            });
        }

        if !(MIN_REFRESH_MS..=MAX_REFRESH_MS).contains(&self.refresh_interval_ms) {
            return Err(ConfigError::Invalid {
                field: "refresh_interval_ms",
                reason: format!(
                    "{} is out of range, must be between {} and {} ms",
                    self.refresh_interval_ms, MIN_REFRESH_MS, MAX_REFRESH_MS
                ),
            });
        }

        Ok(())
    }

    /// Serializes the effective config for `ironsight config`.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
