//! TOML Configuration File Support
//!
//! Configuration loading for the tracker, from a TOML file at
//! `~/.config/visibility-tracker/tracker.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [visibility]
//! min_report_interval_ms = 500
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::debounce::MIN_REPORT_INTERVAL;

/// Environment variable overriding the minimum report interval
pub const ENV_MIN_REPORT_INTERVAL_MS: &str = "VISIBILITY_MIN_REPORT_INTERVAL_MS";

/// Largest accepted minimum report interval
pub const MAX_REPORT_INTERVAL_MS: u64 = 60_000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Structures
// =============================================================================

/// `[visibility]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityToml {
    /// Minimum spacing between two visibility ticks, in milliseconds
    pub min_report_interval_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerToml {
    /// Visibility section
    pub visibility: VisibilityToml,
}

// =============================================================================
// Tracker Configuration
// =============================================================================

/// Runtime configuration of the tracker
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Minimum spacing between two visibility ticks, in milliseconds
    pub min_report_interval_ms: u64,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_report_interval_ms: u64::try_from(MIN_REPORT_INTERVAL.as_millis())
                .unwrap_or(500),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl TrackerConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum report interval
    #[must_use]
    pub fn with_min_report_interval_ms(mut self, ms: u64) -> Self {
        self.min_report_interval_ms = ms;
        self
    }

    /// Minimum report interval as a `Duration`
    #[must_use]
    pub fn min_report_interval(&self) -> Duration {
        Duration::from_millis(self.min_report_interval_ms)
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check that values are usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] when the interval is zero or
    /// larger than [`MAX_REPORT_INTERVAL_MS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_report_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "min_report_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.min_report_interval_ms > MAX_REPORT_INTERVAL_MS {
            return Err(ConfigError::ValidationError(format!(
                "min_report_interval_ms must be at most {MAX_REPORT_INTERVAL_MS} (got {})",
                self.min_report_interval_ms
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/visibility-tracker/tracker.toml`, or `None` if
/// no config directory can be determined.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("visibility-tracker").join("tracker.toml"))
}

/// Load configuration from the default path, environment and defaults
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read, parsed, or
/// validated. A missing config file is not an error.
pub fn load_config() -> Result<TrackerConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read, parsed, or
/// validated.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<TrackerConfig, ConfigError> {
    let mut config = TrackerConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: TrackerToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;

    Ok(config)
}

fn apply_toml_config(config: &mut TrackerConfig, toml: &TrackerToml) {
    if let Some(ms) = toml.visibility.min_report_interval_ms {
        config.min_report_interval_ms = ms;
    }
}

fn apply_env_config(config: &mut TrackerConfig) {
    if let Ok(value) = std::env::var(ENV_MIN_REPORT_INTERVAL_MS) {
        match value.parse::<u64>() {
            Ok(ms) => {
                config.min_report_interval_ms = ms;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(
                var = ENV_MIN_REPORT_INTERVAL_MS,
                value = %value,
                "Ignoring unparsable environment override"
            ),
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Minimum report interval override (milliseconds)
    pub min_report_interval_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum report interval override
    #[must_use]
    pub fn with_min_report_interval_ms(mut self, ms: u64) -> Self {
        self.min_report_interval_ms = Some(ms);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override is out of range.
    pub fn apply(&self, config: &mut TrackerConfig) -> Result<(), ConfigError> {
        if let Some(ms) = self.min_report_interval_ms {
            config.min_report_interval_ms = ms;
            config.source = ConfigSource::Cli;
        }
        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
