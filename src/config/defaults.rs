//! System-wide default constants.
//!
//! Centralises magic numbers used across the client. Grouped by subsystem
//! for easy discovery.

// ============================================================================
// Streaming
// ============================================================================

/// Reconnect back-off floor (seconds). First retry waits this long.
pub const BACKOFF_FLOOR_SECS: u64 = 1;

/// Reconnect back-off ceiling (seconds). Delay doubles per failure up to this.
pub const BACKOFF_CEILING_SECS: u64 = 8;

/// WebSocket dial timeout (seconds).
pub const DIAL_TIMEOUT_SECS: u64 = 10;

/// Outbound frame queue depth.
///
/// Deliberately small: a stale frame is worthless once a newer one exists,
/// so frames beyond this are dropped rather than buffered.
pub const OUTBOUND_QUEUE_DEPTH: usize = 4;

/// Broadcast channel capacity for inbound predictions.
pub const PREDICTION_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Capture
// ============================================================================

/// Default interval between frame captures (ms). 500 ms = 2 fps.
pub const CAPTURE_INTERVAL_MS: u64 = 500;

// ============================================================================
// Speech
// ============================================================================

/// Default speech language tag.
pub const SPEECH_LANGUAGE: &str = "en-US";

/// Default speech rate multiplier (0.5 = slower, 2.0 = faster).
pub const SPEECH_RATE: f64 = 1.0;

/// Default speech pitch multiplier (0.5 = lower, 2.0 = higher).
pub const SPEECH_PITCH: f64 = 1.0;

/// Default speech volume (0.0 - 1.0).
pub const SPEECH_VOLUME: f64 = 1.0;
