//! Non-visual feedback: speech + vibration alert delivery
//!
//! - `devices`: platform device seams and logging implementations
//! - `coordinator`: per-alert concurrent dispatch with superseding semantics

mod coordinator;
mod devices;

pub use coordinator::{FeedbackCoordinator, FeedbackSession, PatternSegment, VibrationPattern};
pub use devices::{FeedbackError, LoggingSpeech, LoggingVibration, SpeechDevice, VibrationDevice};
