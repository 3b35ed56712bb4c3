//! Pipeline runner: capture tick → transport, predictions → feedback
//!
//! Thin orchestration over the three core components. On each capture tick
//! a frame is pulled from the source and handed to the transport
//! (fire-and-forget); each broadcast prediction is classified and turned
//! into feedback. Both loops run in one select driven by a cancellation
//! token, matching the rest of the client's shutdown model.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::feedback::FeedbackCoordinator;
use crate::streaming::StreamingClient;
use crate::types::{FrameMessage, PredictionMessage, SeverityTier};

use super::source::{FrameEvent, FrameSource};

/// Counters for one runner lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerStats {
    pub frames_captured: u64,
    pub predictions_handled: u64,
    pub predictions_skipped: u64,
    pub alerts_delivered: u64,
}

/// Glue between capture, transport, classification and feedback.
pub struct PipelineRunner {
    client: StreamingClient,
    coordinator: Arc<FeedbackCoordinator>,
    capture_interval: Duration,
}

impl PipelineRunner {
    #[must_use]
    pub fn new(
        client: StreamingClient,
        coordinator: Arc<FeedbackCoordinator>,
        capture_interval: Duration,
    ) -> Self {
        Self {
            client,
            coordinator,
            capture_interval,
        }
    }

    /// Run until cancelled or the frame source is exhausted with no more
    /// predictions expected. Returns the final counters.
    pub async fn run(
        &self,
        mut source: Box<dyn FrameSource>,
        cancel: CancellationToken,
    ) -> RunnerStats {
        let mut stats = RunnerStats::default();
        let mut predictions = self.client.predictions();

        let mut ticker = tokio::time::interval(self.capture_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut capture_done = false;

        tracing::info!(
            source = source.source_name(),
            interval_ms = self.capture_interval.as_millis() as u64,
            "Pipeline runner started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Pipeline runner cancelled");
                    break;
                }
                _ = ticker.tick(), if !capture_done => {
                    match source.next_frame().await {
                        Ok(FrameEvent::Frame(bytes)) => {
                            stats.frames_captured += 1;
                            self.client.send_frame(&FrameMessage::from_jpeg(&bytes));
                        }
                        Ok(FrameEvent::Eof) => {
                            tracing::info!(
                                source = source.source_name(),
                                frames = stats.frames_captured,
                                "Frame source exhausted"
                            );
                            capture_done = true;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Frame capture failed — skipping tick");
                        }
                    }
                }
                inbound = predictions.recv() => {
                    match inbound {
                        Ok(message) => {
                            self.handle_prediction(&message, &mut stats).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Stale predictions are as worthless as stale
                            // frames; resume from the newest.
                            tracing::warn!(skipped, "Prediction consumer lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Prediction stream closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(
            frames = stats.frames_captured,
            alerts = stats.alerts_delivered,
            "Pipeline runner stopped"
        );
        stats
    }

    /// Classify one prediction and deliver feedback for it.
    async fn handle_prediction(&self, message: &PredictionMessage, stats: &mut RunnerStats) {
        stats.predictions_handled += 1;
        let Some(distance_m) = message.distance_m() else {
            stats.predictions_skipped += 1;
            tracing::debug!("Prediction without numeric distance — skipping");
            return;
        };
        let tier = SeverityTier::classify(distance_m);
        tracing::info!(distance_m, tier = %tier, pulses = tier.pulse_count(), "Obstacle classified");
        self.coordinator.provide_feedback(tier).await;
        stats.alerts_delivered += 1;
    }
}
