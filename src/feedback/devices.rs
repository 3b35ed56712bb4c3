//! Output device seams for non-visual feedback
//!
//! The platform layer supplies the real speech and vibration hardware;
//! the coordinator only talks to these traits. Logging implementations
//! back the binary and demos on hosts without either device.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SpeechSettings;

use super::VibrationPattern;

// ============================================================================
// Error Types
// ============================================================================

/// Feedback device errors. Always caught inside the coordinator; a failing
/// device degrades one modality, never the alert pipeline.
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Device call failed: {0}")]
    Device(String),

    #[error("Speech device not configured")]
    NotConfigured,
}

// ============================================================================
// Device Traits
// ============================================================================

/// Text-to-speech output device.
///
/// One stateful instance per process; the coordinator serializes its own
/// calls into it (stop before speak).
#[async_trait]
pub trait SpeechDevice: Send + Sync {
    /// Apply language, rate, pitch and volume. Called once before first use;
    /// a failure here is retried on the next alert.
    async fn configure(&self, settings: &SpeechSettings) -> Result<(), FeedbackError>;

    /// Submit an utterance. Returns once submitted, not once finished.
    async fn speak(&self, text: &str) -> Result<(), FeedbackError>;

    /// Stop any in-flight utterance. Idempotent; stopping while silent is Ok.
    async fn stop(&self) -> Result<(), FeedbackError>;
}

/// Vibration motor.
#[async_trait]
pub trait VibrationDevice: Send + Sync {
    /// Whether the platform reports vibration hardware.
    fn has_vibrator(&self) -> bool;

    /// Issue a pattern. Returns once the device call is accepted; the
    /// physical buzzing finishes on its own and is not cancellable.
    async fn vibrate(&self, pattern: &VibrationPattern) -> Result<(), FeedbackError>;
}

// ============================================================================
// Logging Implementations
// ============================================================================

/// Speech device that logs utterances instead of speaking them.
#[derive(Debug, Default)]
pub struct LoggingSpeech;

#[async_trait]
impl SpeechDevice for LoggingSpeech {
    async fn configure(&self, settings: &SpeechSettings) -> Result<(), FeedbackError> {
        tracing::info!(
            language = %settings.language,
            rate = settings.rate,
            pitch = settings.pitch,
            volume = settings.volume,
            "Speech device configured"
        );
        Ok(())
    }

    async fn speak(&self, text: &str) -> Result<(), FeedbackError> {
        tracing::info!(text = %text, "SPEAK");
        Ok(())
    }

    async fn stop(&self) -> Result<(), FeedbackError> {
        tracing::debug!("Speech stopped");
        Ok(())
    }
}

/// Vibration device that logs patterns instead of buzzing.
#[derive(Debug)]
pub struct LoggingVibration {
    present: bool,
}

impl LoggingVibration {
    /// `present = false` models a platform without vibration hardware.
    #[must_use]
    pub fn new(present: bool) -> Self {
        Self { present }
    }
}

impl Default for LoggingVibration {
    fn default() -> Self {
        Self { present: true }
    }
}

#[async_trait]
impl VibrationDevice for LoggingVibration {
    fn has_vibrator(&self) -> bool {
        self.present
    }

    async fn vibrate(&self, pattern: &VibrationPattern) -> Result<(), FeedbackError> {
        tracing::info!(
            pulses = pattern.pulse_count(),
            total_ms = pattern.total_duration_ms(),
            "VIBRATE"
        );
        Ok(())
    }
}
