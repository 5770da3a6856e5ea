//! Configuration management for Contour
//!
//! This module provides:
//! - Engine setup (sample rate, maximum block size)
//! - Display setup (response resolution, refresh interval)
//! - Async TOML load/save with validation after load
//!
//! Parameter values are deliberately not part of the file; they live in the
//! parameter store at runtime.

use crate::domain::audio::ProcessSpec;
use crate::domain::params::MAX_FREQUENCY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Upper bound on display bins, one per pixel of a very wide analyzer
pub const MAX_RESPONSE_BINS: usize = 8192;

/// Audio engine setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz
    pub sample_rate: f64,

    /// Largest block the host will deliver, in frames
    pub max_block_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let spec = ProcessSpec::default();
        Self {
            sample_rate: spec.sample_rate,
            max_block_size: spec.maximum_block_size,
        }
    }
}

impl EngineConfig {
    pub fn process_spec(&self) -> ProcessSpec {
        ProcessSpec::new(self.sample_rate, self.max_block_size)
    }
}

/// Response display setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Number of bins across the 20 Hz - 20 kHz axis
    pub response_bins: usize,

    /// Refresh timer period in milliseconds
    pub refresh_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            response_bins: 512,
            refresh_interval_ms: 16,
        }
    }
}

impl DisplayConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Complete Contour configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContourConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

impl ContourConfig {
    /// Check every field against what the engine and display accept
    pub fn validate(&self) -> Result<()> {
        self.engine
            .process_spec()
            .validate(f64::from(MAX_FREQUENCY))
            .map_err(|e| ConfigError::Invalid(format!("engine: {e}")))?;

        if self.display.response_bins == 0 || self.display.response_bins > MAX_RESPONSE_BINS {
            return Err(ConfigError::Invalid(format!(
                "display: response_bins must be in 1..={MAX_RESPONSE_BINS}, got {}",
                self.display.response_bins
            )));
        }

        if self.display.refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "display: refresh_interval_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&contents)?;

        debug!(
            sample_rate = config.engine.sample_rate,
            max_block_size = config.engine.max_block_size,
            bins = config.display.response_bins,
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_valid() {
        let config = ContourConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.sample_rate, 48000.0);
        assert_eq!(config.engine.max_block_size, 512);
        assert_eq!(config.display.refresh_interval(), Duration::from_millis(16));
    }

    #[test]
    fn test_config_serialization() {
        let config = ContourConfig {
            engine: EngineConfig {
                sample_rate: 96000.0,
                max_block_size: 128,
            },
            display: DisplayConfig {
                response_bins: 300,
                refresh_interval_ms: 33,
            },
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ContourConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = ContourConfig::from_toml_str("[engine]\nsample_rate = 44100.0\n").unwrap();
        assert_eq!(config.engine.sample_rate, 44100.0);
        assert_eq!(config.engine.max_block_size, 512);
        assert_eq!(config.display, DisplayConfig::default());

        let empty = ContourConfig::from_toml_str("").unwrap();
        assert_eq!(empty, ContourConfig::default());
    }

    #[test]
    fn test_rejects_invalid_engine() {
        for contents in [
            "[engine]\nsample_rate = 0.0\n",
            "[engine]\nsample_rate = -48000.0\n",
            "[engine]\nmax_block_size = 0\n",
            // Nyquist at or below the 20 kHz ceiling
            "[engine]\nsample_rate = 32000.0\n",
            "[engine]\nsample_rate = 40000.0\n",
        ] {
            let result = ContourConfig::from_toml_str(contents);
            assert!(
                matches!(result, Err(ConfigError::Invalid(_))),
                "accepted {contents:?}"
            );
        }
    }

    #[test]
    fn test_rejects_invalid_display() {
        for contents in [
            "[display]\nresponse_bins = 0\n",
            "[display]\nresponse_bins = 100000\n",
            "[display]\nrefresh_interval_ms = 0\n",
        ] {
            assert!(matches!(
                ContourConfig::from_toml_str(contents),
                Err(ConfigError::Invalid(_))
            ));
        }
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            ContourConfig::from_toml_str("[engine\nsample_rate ="),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[tokio::test]
    async fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("contour.toml");

        let mut config = ContourConfig::default();
        config.engine.sample_rate = 44100.0;
        config.display.response_bins = 1024;
        config.save_to_file(&config_path).await.unwrap();

        assert!(config_path.exists());

        let loaded = ContourConfig::load_from_file(&config_path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ContourConfig::load_from_file(temp_dir.path().join("missing.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        tokio::fs::write(&path, "[engine]\nmax_block_size = 0\n")
            .await
            .unwrap();

        let result = ContourConfig::load_from_file(&path).await;
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
