//! Player configuration and persistence.
//!
//! All behavioral knobs of the playback controller and metadata pipeline
//! live here, with production defaults. Feature differences between player
//! builds (health check on/off, visualizer wiring) are configuration
//! flags, not separate code paths.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{AirwaveError, AirwaveResult};

const CONFIG_FILE: &str = "player.json";

/// Global mutex to serialize config file operations.
/// Prevents races between concurrent save calls.
static CONFIG_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn config_lock() -> &'static Mutex<()> {
    CONFIG_LOCK.get_or_init(|| Mutex::new(()))
}

/// Normalizes a volume value to the internal 0.0-1.0 scale.
///
/// UI surfaces disagree on scale (sliders report 0-100, elements take
/// 0.0-1.0); anything above 1.0 is interpreted as a percentage.
#[must_use]
pub fn normalize_volume(volume: f32) -> f32 {
    let volume = if volume > 1.0 { volume / 100.0 } else { volume };
    volume.clamp(0.0, 1.0)
}

/// Retry and settle timing for the reconnection machinery.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum reconnection attempts before giving up with `Error` status.
    pub max_attempts: u32,

    /// Initial backoff delay between failed attempts (milliseconds).
    pub base_delay_ms: u64,

    /// Backoff cap (milliseconds).
    pub max_delay_ms: u64,

    /// Settle delay after a hard media error before the first attempt.
    pub error_settle_ms: u64,

    /// Settle delay after a stall before the first attempt.
    pub stall_settle_ms: u64,

    /// Settle delay after connectivity returns before reconnecting.
    pub online_settle_ms: u64,

    /// Pause between tearing down the broken source and assigning a new one.
    pub teardown_settle_ms: u64,

    /// Pause between assigning the new source and issuing the play request.
    pub play_settle_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2000,
            max_delay_ms: 30000,
            error_settle_ms: 2000,
            stall_settle_ms: 3000,
            online_settle_ms: 1000,
            teardown_settle_ms: 1000,
            play_settle_ms: 500,
        }
    }
}

impl RetryConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be >= 1".to_string());
        }
        if self.base_delay_ms == 0 {
            return Err("base_delay_ms must be >= 1".to_string());
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err("max_delay_ms must be >= base_delay_ms".to_string());
        }
        Ok(())
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn error_settle(&self) -> Duration {
        Duration::from_millis(self.error_settle_ms)
    }

    pub fn stall_settle(&self) -> Duration {
        Duration::from_millis(self.stall_settle_ms)
    }

    pub fn online_settle(&self) -> Duration {
        Duration::from_millis(self.online_settle_ms)
    }

    pub fn teardown_settle(&self) -> Duration {
        Duration::from_millis(self.teardown_settle_ms)
    }

    pub fn play_settle(&self) -> Duration {
        Duration::from_millis(self.play_settle_ms)
    }
}

/// Periodic liveness probe configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Whether the probe runs at all.
    pub enabled: bool,

    /// Probe interval (seconds).
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
        }
    }
}

impl HealthCheckConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.interval_secs == 0 {
            return Err("health check interval_secs must be >= 1".to_string());
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Now-playing metadata pipeline configuration.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MetadataConfig {
    /// Server-push metadata feed URL. `None` disables the pipeline.
    pub feed_url: Option<String>,

    /// Delay before re-subscribing after a feed transport error (milliseconds).
    pub resubscribe_delay_ms: u64,

    /// Whether to look up cover art for each track.
    pub artwork_lookup: bool,

    /// Placeholder artwork shown while a lookup is pending or after a miss.
    pub placeholder_art: Option<String>,
}

impl MetadataConfig {
    pub fn resubscribe_delay(&self) -> Duration {
        // Zero would spin against a dead feed; floor at one second.
        Duration::from_millis(self.resubscribe_delay_ms.max(1000))
    }

    /// Builds the artwork resolution settings for the presenter.
    #[must_use]
    pub fn artwork_config(&self) -> crate::artwork::ArtworkConfig {
        crate::artwork::ArtworkConfig {
            lookup: self.artwork_lookup,
            placeholder_url: self.placeholder_art.clone(),
        }
    }
}

/// Configuration for the Airwave player.
///
/// All fields have sensible defaults except `stream_url`, which validation
/// requires to be non-empty.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PlayerConfig {
    /// The live stream base URL.
    pub stream_url: String,

    /// Initial volume. Accepts 0.0-1.0 or 0-100; normalized internally.
    pub volume: f32,

    /// Whether visualizer on/off notifications are emitted.
    pub visualizer: bool,

    /// Reconnection behavior.
    pub retry: RetryConfig,

    /// Liveness probe behavior.
    pub health_check: HealthCheckConfig,

    /// Metadata pipeline behavior.
    pub metadata: MetadataConfig,
}

impl PlayerConfig {
    /// Creates a configuration for the given stream URL with default behavior.
    pub fn for_stream(stream_url: impl Into<String>) -> Self {
        Self {
            stream_url: stream_url.into(),
            volume: 0.5,
            visualizer: true,
            metadata: MetadataConfig {
                resubscribe_delay_ms: 5000,
                artwork_lookup: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AirwaveError::Configuration`] if any value would cause
    /// runtime issues.
    pub fn validate(&self) -> AirwaveResult<()> {
        if self.stream_url.trim().is_empty() {
            return Err(AirwaveError::Configuration(
                "stream_url must not be empty".to_string(),
            ));
        }
        self.retry.validate().map_err(AirwaveError::Configuration)?;
        self.health_check
            .validate()
            .map_err(AirwaveError::Configuration)?;
        Ok(())
    }

    /// Extracts the controller-facing subset of the configuration.
    #[must_use]
    pub fn controller_config(&self) -> crate::controller::ControllerConfig {
        crate::controller::ControllerConfig {
            retry: self.retry.clone(),
            health_check: self.health_check.clone(),
            visualizer: self.visualizer,
        }
    }

    /// Loads configuration from the data directory.
    ///
    /// Returns defaults if the file doesn't exist or is invalid.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Saves configuration to the data directory.
    ///
    /// Uses atomic write (temp file + rename) to prevent corruption on crash.
    /// Creates the directory if it doesn't exist.
    pub fn save(&self, data_dir: &Path) -> std::io::Result<()> {
        let _guard = config_lock().lock();
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(CONFIG_FILE);
        let temp_path = data_dir.join("player.json.tmp");
        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_retry_config_is_valid() {
        assert!(RetryConfig::default().validate().is_ok());
    }

    #[test]
    fn retry_config_rejects_bad_values() {
        let mut config = RetryConfig::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = RetryConfig::default();
        config.max_delay_ms = config.base_delay_ms - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn player_config_requires_stream_url() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_err());

        let config = PlayerConfig::for_stream("https://stream.example.com/live");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn normalize_volume_handles_both_scales() {
        assert_eq!(normalize_volume(0.5), 0.5);
        assert_eq!(normalize_volume(80.0), 0.8);
        assert_eq!(normalize_volume(-1.0), 0.0);
        assert_eq!(normalize_volume(1.0), 1.0);
        assert_eq!(normalize_volume(150.0), 1.0);
    }

    #[test]
    fn config_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let mut config = PlayerConfig::for_stream("https://stream.example.com/live");
        config.retry.max_attempts = 8;
        config.save(dir.path()).unwrap();

        let loaded = PlayerConfig::load(dir.path());
        assert_eq!(loaded.stream_url, "https://stream.example.com/live");
        assert_eq!(loaded.retry.max_attempts, 8);
    }

    #[test]
    fn load_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let loaded = PlayerConfig::load(dir.path());
        assert!(loaded.stream_url.is_empty());
    }
}
