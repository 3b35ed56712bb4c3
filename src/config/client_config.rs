//! Client configuration - endpoint, back-off and feedback values as
//! operator-tunable TOML fields.
//!
//! Every struct implements `Default` with values matching the built-in
//! constants, ensuring zero-change behavior when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

/// Configuration loading / validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a client deployment.
///
/// Load with `ClientConfig::load()` which searches:
/// 1. `$WAYSENSE_CONFIG` env var
/// 2. `./waysense.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    /// Remote predictor endpoint
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Reconnect back-off tuning
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Speech device configuration
    #[serde(default)]
    pub speech: SpeechSettings,

    /// Frame capture cadence
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl ClientConfig {
    /// Load configuration using the standard search order:
    /// 1. `$WAYSENSE_CONFIG` environment variable
    /// 2. `./waysense.toml` in the current working directory
    /// 3. Built-in defaults
    #[must_use]
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("WAYSENSE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded client config from WAYSENSE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from WAYSENSE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "WAYSENSE_CONFIG points to non-existent file, falling back");
            }
        }

        let cwd_config = Path::new("waysense.toml");
        if cwd_config.exists() {
            match Self::load_from_file(cwd_config) {
                Ok(config) => {
                    info!(path = %cwd_config.display(), "Loaded client config from working directory");
                    return config;
                }
                Err(e) => {
                    warn!(path = %cwd_config.display(), error = %e, "Failed to load waysense.toml, using defaults");
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load and validate configuration from a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values. Called on every file load; defaults always pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint.url.starts_with("ws://") && !self.endpoint.url.starts_with("wss://") {
            return Err(ConfigError::Invalid(format!(
                "endpoint.url must use ws:// or wss:// scheme, got '{}'",
                self.endpoint.url
            )));
        }
        if url::Url::parse(&self.endpoint.url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "endpoint.url is not a valid URL: '{}'",
                self.endpoint.url
            )));
        }
        if self.backoff.floor_secs == 0 {
            return Err(ConfigError::Invalid(
                "backoff.floor_secs must be at least 1".to_string(),
            ));
        }
        if self.backoff.ceiling_secs < self.backoff.floor_secs {
            return Err(ConfigError::Invalid(format!(
                "backoff.ceiling_secs ({}) must be >= backoff.floor_secs ({})",
                self.backoff.ceiling_secs, self.backoff.floor_secs
            )));
        }
        if self.capture.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "capture.interval_ms must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.speech.volume) {
            return Err(ConfigError::Invalid(format!(
                "speech.volume must be within 0.0..=1.0, got {}",
                self.speech.volume
            )));
        }
        if !(0.5..=2.0).contains(&self.speech.rate) {
            return Err(ConfigError::Invalid(format!(
                "speech.rate must be within 0.5..=2.0, got {}",
                self.speech.rate
            )));
        }
        if !(0.5..=2.0).contains(&self.speech.pitch) {
            return Err(ConfigError::Invalid(format!(
                "speech.pitch must be within 0.5..=2.0, got {}",
                self.speech.pitch
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Remote predictor endpoint. Resolved once at client construction,
/// never renegotiated mid-session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// WebSocket URL of the prediction service
    #[serde(default = "default_endpoint_url")]
    pub url: String,
}

fn default_endpoint_url() -> String {
    "ws://127.0.0.1:8000/ws/predict".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
        }
    }
}

/// Reconnect back-off bounds. Delay doubles per failed attempt from the
/// floor up to the ceiling, resetting to the floor on any success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Initial retry delay (seconds)
    #[serde(default = "default_backoff_floor")]
    pub floor_secs: u64,

    /// Maximum retry delay (seconds)
    #[serde(default = "default_backoff_ceiling")]
    pub ceiling_secs: u64,
}

fn default_backoff_floor() -> u64 {
    defaults::BACKOFF_FLOOR_SECS
}

fn default_backoff_ceiling() -> u64 {
    defaults::BACKOFF_CEILING_SECS
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            floor_secs: defaults::BACKOFF_FLOOR_SECS,
            ceiling_secs: defaults::BACKOFF_CEILING_SECS,
        }
    }
}

/// Text-to-speech device settings, applied once before first use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechSettings {
    /// Language tag (e.g. "en-US")
    #[serde(default = "default_speech_language")]
    pub language: String,

    /// Rate multiplier (0.5 = slower, 2.0 = faster)
    #[serde(default = "default_speech_rate")]
    pub rate: f64,

    /// Pitch multiplier (0.5 = lower, 2.0 = higher)
    #[serde(default = "default_speech_pitch")]
    pub pitch: f64,

    /// Volume (0.0 - 1.0)
    #[serde(default = "default_speech_volume")]
    pub volume: f64,
}

fn default_speech_language() -> String {
    defaults::SPEECH_LANGUAGE.to_string()
}

fn default_speech_rate() -> f64 {
    defaults::SPEECH_RATE
}

fn default_speech_pitch() -> f64 {
    defaults::SPEECH_PITCH
}

fn default_speech_volume() -> f64 {
    defaults::SPEECH_VOLUME
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            language: default_speech_language(),
            rate: defaults::SPEECH_RATE,
            pitch: defaults::SPEECH_PITCH,
            volume: defaults::SPEECH_VOLUME,
        }
    }
}

/// Frame capture cadence for the pipeline runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Interval between captured frames (ms)
    #[serde(default = "default_capture_interval")]
    pub interval_ms: u64,
}

fn default_capture_interval() -> u64 {
    defaults::CAPTURE_INTERVAL_MS
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::CAPTURE_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backoff.floor_secs, 1);
        assert_eq!(config.backoff.ceiling_secs, 8);
        assert_eq!(config.speech.rate, 1.0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [endpoint]
            url = "wss://predictor.example.com/ws/predict"
            "#,
        )
        .expect("valid TOML");
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint.url, "wss://predictor.example.com/ws/predict");
        assert_eq!(config.backoff.ceiling_secs, 8);
        assert_eq!(config.capture.interval_ms, 500);
    }

    #[test]
    fn rejects_non_websocket_scheme() {
        let config: ClientConfig = toml::from_str(
            r#"
            [endpoint]
            url = "http://predictor.example.com/ws"
            "#,
        )
        .expect("valid TOML");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_inverted_backoff_bounds() {
        let config: ClientConfig = toml::from_str(
            r#"
            [backoff]
            floor_secs = 4
            ceiling_secs = 2
            "#,
        )
        .expect("valid TOML");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_floor() {
        let config: ClientConfig = toml::from_str(
            r#"
            [backoff]
            floor_secs = 0
            "#,
        )
        .expect("valid TOML");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_out_of_range_speech_tuning() {
        let config: ClientConfig = toml::from_str(
            r#"
            [speech]
            rate = 0.0
            "#,
        )
        .expect("valid TOML");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config: ClientConfig = toml::from_str(
            r#"
            [speech]
            pitch = 3.5
            "#,
        )
        .expect("valid TOML");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_from_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("waysense.toml");
        std::fs::write(
            &path,
            r#"
            [endpoint]
            url = "ws://10.0.0.5:8000/ws/predict"

            [capture]
            interval_ms = 250
            "#,
        )
        .expect("write config");

        let config = ClientConfig::load_from_file(&path).expect("load config");
        assert_eq!(config.endpoint.url, "ws://10.0.0.5:8000/ws/predict");
        assert_eq!(config.capture.interval_ms, 250);
    }
}
