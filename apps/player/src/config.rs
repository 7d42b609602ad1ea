//! Player configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use airwave_core::{HealthCheckConfig, MetadataConfig, PlayerConfig, RetryConfig};
use anyhow::{Context, Result};
use serde::Deserialize;

/// Player configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Live stream URL.
    /// Override: `AIRWAVE_STREAM_URL`
    pub stream_url: String,

    /// Now-playing metadata feed URL. Unset disables metadata.
    /// Override: `AIRWAVE_METADATA_URL`
    pub metadata_url: Option<String>,

    /// Initial volume, 0.0-1.0 (or 0-100).
    /// Override: `AIRWAVE_VOLUME`
    pub volume: f32,

    /// Emit visualizer on/off notifications around playback.
    pub visualizer: bool,

    /// Look up cover art for each track.
    pub artwork_lookup: bool,

    /// Placeholder artwork URL while a lookup is pending or after a miss.
    pub placeholder_art: Option<String>,

    /// Seconds without stream data before the element reports a stall.
    pub stall_timeout_secs: u64,

    /// Reconnection behavior.
    pub retry: RetryConfig,

    /// Liveness probe behavior.
    pub health_check: HealthCheckConfig,

    /// Directory for persisting the resolved player settings.
    /// Override: `AIRWAVE_DATA_DIR`
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stream_url: String::new(),
            metadata_url: None,
            volume: 0.5,
            visualizer: true,
            artwork_lookup: true,
            placeholder_art: None,
            stall_timeout_secs: 15,
            retry: RetryConfig::default(),
            health_check: HealthCheckConfig::default(),
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AIRWAVE_STREAM_URL") {
            if !val.is_empty() {
                self.stream_url = val;
            }
        }

        if let Ok(val) = std::env::var("AIRWAVE_METADATA_URL") {
            if !val.is_empty() {
                self.metadata_url = Some(val);
            }
        }

        if let Ok(val) = std::env::var("AIRWAVE_VOLUME") {
            if let Ok(volume) = val.parse() {
                self.volume = volume;
            }
        }

        // Note: AIRWAVE_DATA_DIR is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to airwave-core's PlayerConfig type.
    pub fn to_player_config(&self) -> PlayerConfig {
        PlayerConfig {
            stream_url: self.stream_url.clone(),
            volume: self.volume,
            visualizer: self.visualizer,
            retry: self.retry.clone(),
            health_check: self.health_check.clone(),
            metadata: MetadataConfig {
                feed_url: self.metadata_url.clone(),
                resubscribe_delay_ms: 5000,
                artwork_lookup: self.artwork_lookup,
                placeholder_art: self.placeholder_art.clone(),
            },
        }
    }
}
