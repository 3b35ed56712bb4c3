//! Feedback coordinator: concurrent speech + vibration per alert
//!
//! A new alert supersedes the previous one: stale speech is stopped, never
//! queued behind. Vibration patterns are not cancellable once issued; a new
//! pattern may overlap physically with a finishing one, which is accepted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::config::SpeechSettings;
use crate::types::{alert_thresholds, SeverityTier};

use super::devices::{FeedbackError, SpeechDevice, VibrationDevice};

// ============================================================================
// Vibration Pattern
// ============================================================================

/// One (pause, buzz) step of a vibration pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSegment {
    /// Leading pause before the buzz (ms)
    pub pause_ms: u64,
    /// Buzz duration (ms)
    pub buzz_ms: u64,
}

/// A tier's vibration pattern: fixed 100 ms pulses separated by fixed
/// 150 ms gaps, one pulse per tier severity step, zero leading pause on
/// the first pulse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibrationPattern {
    segments: Vec<PatternSegment>,
}

impl VibrationPattern {
    /// Build the pattern for a severity tier.
    #[must_use]
    pub fn for_tier(tier: SeverityTier) -> Self {
        let segments = (0..tier.pulse_count())
            .map(|i| PatternSegment {
                pause_ms: if i == 0 { 0 } else { alert_thresholds::PULSE_GAP_MS },
                buzz_ms: alert_thresholds::PULSE_BUZZ_MS,
            })
            .collect();
        Self { segments }
    }

    /// The (pause, buzz) segments in delivery order.
    #[must_use]
    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Number of pulses in the pattern.
    #[must_use]
    pub fn pulse_count(&self) -> usize {
        self.segments.len()
    }

    /// Wall-clock length of the full pattern (ms).
    #[must_use]
    pub fn total_duration_ms(&self) -> u64 {
        self.segments.iter().map(|s| s.pause_ms + s.buzz_ms).sum()
    }
}

// ============================================================================
// Feedback Session
// ============================================================================

/// One in-flight (vibration, speech) pair for a single alert.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackSession {
    pub tier: SeverityTier,
    pub started_at: DateTime<Utc>,
}

// ============================================================================
// Coordinator
// ============================================================================

/// Drives the speech and vibration devices for each alert.
///
/// Both devices are injected at construction; there is no hidden global
/// device state. One coordinator instance is expected per process.
pub struct FeedbackCoordinator {
    speech: Arc<dyn SpeechDevice>,
    vibration: Arc<dyn VibrationDevice>,
    settings: SpeechSettings,
    speech_configured: AtomicBool,
    last_session: Mutex<Option<FeedbackSession>>,
}

impl FeedbackCoordinator {
    #[must_use]
    pub fn new(
        speech: Arc<dyn SpeechDevice>,
        vibration: Arc<dyn VibrationDevice>,
        settings: SpeechSettings,
    ) -> Self {
        Self {
            speech,
            vibration,
            settings,
            speech_configured: AtomicBool::new(false),
            last_session: Mutex::new(None),
        }
    }

    /// Deliver feedback for an alert tier.
    ///
    /// Dispatches speech and vibration concurrently; returns once both have
    /// been issued. Any in-flight utterance from a previous alert is stopped
    /// first. Device failures are logged per modality and never propagate —
    /// this call cannot fail and cannot deadlock on a broken device.
    pub async fn provide_feedback(&self, tier: SeverityTier) {
        let session = FeedbackSession {
            tier,
            started_at: Utc::now(),
        };
        if let Ok(mut guard) = self.last_session.lock() {
            *guard = Some(session);
        }

        tracing::debug!(tier = %tier, "Delivering alert feedback");
        tokio::join!(self.deliver_speech(tier), self.deliver_vibration(tier));
    }

    /// The most recent alert session, if any.
    #[must_use]
    pub fn last_session(&self) -> Option<FeedbackSession> {
        self.last_session.lock().ok().and_then(|guard| *guard)
    }

    async fn deliver_speech(&self, tier: SeverityTier) {
        // The newest obstacle wins: interrupt whatever is still speaking.
        if let Err(e) = self.speech.stop().await {
            tracing::warn!(error = %e, "Failed to stop previous utterance");
        }

        if let Err(e) = self.ensure_speech_configured().await {
            // Still speak: an unconfigured voice beats a silent one.
            tracing::warn!(error = %e, "Speaking without device configuration");
        }

        match self.speech.speak(tier.spoken_alert()).await {
            Ok(()) => tracing::debug!(tier = %tier, "Utterance submitted"),
            Err(e) => tracing::warn!(tier = %tier, error = %e, "Speech delivery failed"),
        }
    }

    /// Configure the speech device once. A failed configure is retried on
    /// the next alert rather than inhibiting the device permanently.
    async fn ensure_speech_configured(&self) -> Result<(), FeedbackError> {
        if self.speech_configured.load(Ordering::Acquire) {
            return Ok(());
        }
        match self.speech.configure(&self.settings).await {
            Ok(()) => {
                self.speech_configured.store(true, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Speech configuration failed — will retry on next alert");
                Err(FeedbackError::NotConfigured)
            }
        }
    }

    async fn deliver_vibration(&self, tier: SeverityTier) {
        if !self.vibration.has_vibrator() {
            tracing::trace!("No vibration hardware — skipping");
            return;
        }
        let pattern = VibrationPattern::for_tier(tier);
        if let Err(e) = self.vibration.vibrate(&pattern).await {
            tracing::warn!(tier = %tier, error = %e, "Vibration delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::devices::FeedbackError;
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    /// Everything the speech device was asked to do, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum SpeechEvent {
        Stop,
        Speak(String),
    }

    #[derive(Default)]
    struct RecordingSpeech {
        events: Mutex<Vec<SpeechEvent>>,
        configure_calls: AtomicU32,
        failing_configures: AtomicU32,
        fail_speak: AtomicBool,
    }

    impl RecordingSpeech {
        fn events(&self) -> Vec<SpeechEvent> {
            self.events.lock().map(|g| g.clone()).unwrap_or_default()
        }

        fn last_spoken(&self) -> Option<String> {
            self.events()
                .into_iter()
                .rev()
                .find_map(|e| match e {
                    SpeechEvent::Speak(text) => Some(text),
                    SpeechEvent::Stop => None,
                })
        }
    }

    #[async_trait]
    impl SpeechDevice for RecordingSpeech {
        async fn configure(&self, _settings: &SpeechSettings) -> Result<(), FeedbackError> {
            self.configure_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_configures.load(Ordering::SeqCst) > 0 {
                self.failing_configures.fetch_sub(1, Ordering::SeqCst);
                return Err(FeedbackError::Device("tts engine not ready".into()));
            }
            Ok(())
        }

        async fn speak(&self, text: &str) -> Result<(), FeedbackError> {
            if self.fail_speak.load(Ordering::SeqCst) {
                return Err(FeedbackError::Device("tts engine crashed".into()));
            }
            if let Ok(mut g) = self.events.lock() {
                g.push(SpeechEvent::Speak(text.to_string()));
            }
            Ok(())
        }

        async fn stop(&self) -> Result<(), FeedbackError> {
            if let Ok(mut g) = self.events.lock() {
                g.push(SpeechEvent::Stop);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingVibration {
        absent: bool,
        fail: bool,
        patterns: Mutex<Vec<VibrationPattern>>,
    }

    impl RecordingVibration {
        fn patterns(&self) -> Vec<VibrationPattern> {
            self.patterns.lock().map(|g| g.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl VibrationDevice for RecordingVibration {
        fn has_vibrator(&self) -> bool {
            !self.absent
        }

        async fn vibrate(&self, pattern: &VibrationPattern) -> Result<(), FeedbackError> {
            if self.fail {
                return Err(FeedbackError::Device("vibrator busy".into()));
            }
            if let Ok(mut g) = self.patterns.lock() {
                g.push(pattern.clone());
            }
            Ok(())
        }
    }

    fn coordinator(
        speech: Arc<RecordingSpeech>,
        vibration: Arc<RecordingVibration>,
    ) -> FeedbackCoordinator {
        FeedbackCoordinator::new(speech, vibration, SpeechSettings::default())
    }

    #[test]
    fn pattern_shapes_match_tiers() {
        let info = VibrationPattern::for_tier(SeverityTier::Informational);
        assert_eq!(info.pulse_count(), 1);
        assert_eq!(info.segments()[0], PatternSegment { pause_ms: 0, buzz_ms: 100 });

        let warning = VibrationPattern::for_tier(SeverityTier::Warning);
        assert_eq!(warning.pulse_count(), 2);
        assert_eq!(warning.segments()[1], PatternSegment { pause_ms: 150, buzz_ms: 100 });

        let critical = VibrationPattern::for_tier(SeverityTier::Critical);
        assert_eq!(critical.pulse_count(), 3);
        // 3 * 100 buzz + 2 * 150 gap
        assert_eq!(critical.total_duration_ms(), 600);
    }

    #[tokio::test]
    async fn feedback_drives_both_modalities() {
        let speech = Arc::new(RecordingSpeech::default());
        let vibration = Arc::new(RecordingVibration::default());
        let coordinator = coordinator(Arc::clone(&speech), Arc::clone(&vibration));

        coordinator.provide_feedback(SeverityTier::Warning).await;

        assert_eq!(
            speech.last_spoken().as_deref(),
            Some(SeverityTier::Warning.spoken_alert())
        );
        let patterns = vibration.patterns();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pulse_count(), 2);
        assert_eq!(
            coordinator.last_session().map(|s| s.tier),
            Some(SeverityTier::Warning)
        );
    }

    #[tokio::test]
    async fn new_alert_supersedes_previous_speech() {
        let speech = Arc::new(RecordingSpeech::default());
        let vibration = Arc::new(RecordingVibration::default());
        let coordinator = coordinator(Arc::clone(&speech), vibration);

        coordinator.provide_feedback(SeverityTier::Critical).await;
        coordinator.provide_feedback(SeverityTier::Informational).await;

        let events = speech.events();
        // Every speak is preceded by a stop: the second alert interrupts,
        // never queues behind, the first.
        assert_eq!(
            events,
            vec![
                SpeechEvent::Stop,
                SpeechEvent::Speak(SeverityTier::Critical.spoken_alert().to_string()),
                SpeechEvent::Stop,
                SpeechEvent::Speak(SeverityTier::Informational.spoken_alert().to_string()),
            ]
        );
        assert_eq!(
            speech.last_spoken().as_deref(),
            Some(SeverityTier::Informational.spoken_alert())
        );
    }

    #[tokio::test]
    async fn missing_vibrator_is_skipped_silently() {
        let speech = Arc::new(RecordingSpeech::default());
        let vibration = Arc::new(RecordingVibration {
            absent: true,
            ..RecordingVibration::default()
        });
        let coordinator = coordinator(Arc::clone(&speech), Arc::clone(&vibration));

        coordinator.provide_feedback(SeverityTier::Critical).await;

        assert!(vibration.patterns().is_empty());
        // Speech is unaffected.
        assert_eq!(
            speech.last_spoken().as_deref(),
            Some(SeverityTier::Critical.spoken_alert())
        );
    }

    #[tokio::test]
    async fn speech_failure_does_not_affect_vibration() {
        let speech = Arc::new(RecordingSpeech {
            fail_speak: AtomicBool::new(true),
            ..RecordingSpeech::default()
        });
        let vibration = Arc::new(RecordingVibration::default());
        let coordinator = coordinator(speech, Arc::clone(&vibration));

        // Must complete without panicking or returning an error.
        coordinator.provide_feedback(SeverityTier::Critical).await;

        assert_eq!(vibration.patterns().len(), 1);
    }

    #[tokio::test]
    async fn vibration_failure_does_not_affect_speech() {
        let speech = Arc::new(RecordingSpeech::default());
        let vibration = Arc::new(RecordingVibration {
            fail: true,
            ..RecordingVibration::default()
        });
        let coordinator = coordinator(Arc::clone(&speech), vibration);

        coordinator.provide_feedback(SeverityTier::Warning).await;

        assert_eq!(
            speech.last_spoken().as_deref(),
            Some(SeverityTier::Warning.spoken_alert())
        );
    }

    #[tokio::test]
    async fn configure_failure_reports_not_configured() {
        let speech = Arc::new(RecordingSpeech {
            failing_configures: AtomicU32::new(1),
            ..RecordingSpeech::default()
        });
        let vibration = Arc::new(RecordingVibration::default());
        let coordinator = coordinator(Arc::clone(&speech), vibration);

        let first = coordinator.ensure_speech_configured().await;
        assert!(matches!(first, Err(FeedbackError::NotConfigured)));
        // The retry succeeds and latches; no further configure calls.
        assert!(coordinator.ensure_speech_configured().await.is_ok());
        assert!(coordinator.ensure_speech_configured().await.is_ok());
        assert_eq!(speech.configure_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_configure_is_retried_on_next_alert() {
        let speech = Arc::new(RecordingSpeech {
            failing_configures: AtomicU32::new(1),
            ..RecordingSpeech::default()
        });
        let vibration = Arc::new(RecordingVibration::default());
        let coordinator = coordinator(Arc::clone(&speech), vibration);

        coordinator.provide_feedback(SeverityTier::Warning).await;
        // First configure failed but speech was still attempted.
        assert_eq!(speech.configure_calls.load(Ordering::SeqCst), 1);
        assert!(speech.last_spoken().is_some());

        coordinator.provide_feedback(SeverityTier::Critical).await;
        // Second alert retried the configure, which now succeeded.
        assert_eq!(speech.configure_calls.load(Ordering::SeqCst), 2);

        coordinator.provide_feedback(SeverityTier::Critical).await;
        // Configured: no further configure calls.
        assert_eq!(speech.configure_calls.load(Ordering::SeqCst), 2);
    }
}
