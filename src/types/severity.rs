//! Severity tiers and the distance → tier classifier

use serde::{Deserialize, Serialize};

/// Distance thresholds for obstacle alerting
pub mod alert_thresholds {
    // === Distance Tiers (SAFETY-CRITICAL) ===
    /// Obstacles at or beyond this distance are informational (m)
    pub const INFORMATIONAL_DISTANCE_M: f64 = 4.0;
    /// Obstacles closer than this distance are critical (m)
    pub const CRITICAL_DISTANCE_M: f64 = 1.5;

    // === Vibration Pattern ===
    /// Duration of a single vibration pulse (ms)
    pub const PULSE_BUZZ_MS: u64 = 100;
    /// Pause between consecutive pulses (ms)
    pub const PULSE_GAP_MS: u64 = 150;
}

/// Alert severity derived purely from obstacle distance.
///
/// Each tier carries fixed display and feedback data as static lookups.
/// The mapping is total: every f64 input lands in exactly one tier, with
/// closed lower bounds (exactly 4.0 m is Informational, exactly 1.5 m is
/// Warning). Non-comparable input (NaN) falls through to Critical so a
/// corrupt reading errs toward the strongest alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeverityTier {
    Informational = 0,
    Warning = 1,
    Critical = 2,
}

impl SeverityTier {
    /// Classify an obstacle distance (meters) into a severity tier.
    ///
    /// Pure and total. Negative and zero distances classify as Critical.
    #[must_use]
    pub fn classify(distance_m: f64) -> Self {
        if distance_m >= alert_thresholds::INFORMATIONAL_DISTANCE_M {
            SeverityTier::Informational
        } else if distance_m >= alert_thresholds::CRITICAL_DISTANCE_M {
            SeverityTier::Warning
        } else {
            // Everything below 1.5 m, including negative, zero and NaN.
            SeverityTier::Critical
        }
    }

    /// Display label for UI
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SeverityTier::Informational => "Informational",
            SeverityTier::Warning => "Warning",
            SeverityTier::Critical => "Critical",
        }
    }

    /// One-line description of what the tier means
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            SeverityTier::Informational => "Path ahead is clear or obstacle is distant",
            SeverityTier::Warning => "Obstacle approaching, prepare to adjust course",
            SeverityTier::Critical => "Obstacle imminent, immediate action required",
        }
    }

    /// Number of vibration pulses delivered for this tier
    #[must_use]
    pub fn pulse_count(&self) -> u32 {
        match self {
            SeverityTier::Informational => 1,
            SeverityTier::Warning => 2,
            SeverityTier::Critical => 3,
        }
    }

    /// Canned sentence spoken for this tier
    #[must_use]
    pub fn spoken_alert(&self) -> &'static str {
        match self {
            SeverityTier::Informational => "Path is clear.",
            SeverityTier::Warning => "Caution. Obstacle ahead.",
            SeverityTier::Critical => "Stop. Obstacle very close.",
        }
    }

    /// Human-readable distance range for display
    #[must_use]
    pub fn range_description(&self) -> &'static str {
        match self {
            SeverityTier::Informational => "4 m and beyond",
            SeverityTier::Warning => "1.5 m to 4 m",
            SeverityTier::Critical => "closer than 1.5 m",
        }
    }
}

impl std::fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
