//! Waysense: assistive obstacle-detection client runtime
//!
//! Real-time sense → decide → alert pipeline for a visually-impaired user:
//!
//! - **Streaming**: self-healing WebSocket transport that ships camera
//!   frames to a remote predictor and fans out decoded prediction messages,
//!   reconnecting with capped exponential back-off.
//! - **Severity**: pure distance → tier classification with fixed per-tier
//!   alert data.
//! - **Feedback**: concurrent speech + vibration delivery where the newest
//!   obstacle always wins over a stale utterance.
//!
//! Every failure in this crate degrades gracefully — a dropped frame, a
//! skipped alert, a delayed reconnect — because an alerting client that
//! crashes on a bad packet is worse than one that misses one alert.

pub mod config;
pub mod feedback;
pub mod pipeline;
pub mod streaming;
pub mod types;

// Re-export configuration
pub use config::ClientConfig;

// Re-export commonly used types
pub use types::{alert_thresholds, FrameMessage, PredictionMessage, SeverityTier};

// Re-export transport
pub use streaming::{Backoff, ConnectionState, StreamingClient, StreamingClientStats};

// Re-export feedback components
pub use feedback::{
    FeedbackCoordinator, FeedbackSession, LoggingSpeech, LoggingVibration, SpeechDevice,
    VibrationDevice, VibrationPattern,
};

// Re-export pipeline glue
pub use pipeline::{FrameSource, PipelineRunner};
