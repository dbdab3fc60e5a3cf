use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the velocity-adaptive prefetch manager.
///
/// Velocities are expressed in pixels per millisecond.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Master switch. When off, scroll telemetry is still tracked but no
    /// sweep is ever issued.
    pub enabled: bool,
    /// Move the trigger point earlier as downward scroll speed increases.
    pub predictive: bool,
    /// Scroll fraction at or past which a sweep always triggers.
    pub threshold: f64,
    /// Lower bound for the predictive trigger point.
    pub min_predictive_threshold: f64,
    /// How far (in scroll fraction) one px/ms of smoothed velocity pulls the
    /// trigger point forward.
    pub velocity_trigger_factor: f64,
    /// Minimum spacing between processed scroll samples (ms). Samples inside
    /// the window are dropped at the I/O boundary.
    pub scroll_debounce_ms: u64,
    /// Position deltas smaller than this (px) are treated as jitter.
    pub deadband_px: f64,
    /// EMA weight given to the newest velocity sample.
    pub velocity_smoothing: f64,
    /// Smoothed velocity at which sweeps go two pages deep.
    pub medium_velocity: f64,
    /// Smoothed velocity at which sweeps go `max_depth` pages deep.
    pub high_velocity: f64,
    /// Upper bound on pages fetched ahead in one sweep.
    pub max_depth: usize,
    /// Lifetime of a cached page (ms).
    pub cache_ttl_ms: u64,
    /// Share of an item's extent that must be inside the viewport for its
    /// cursor to anchor a sweep.
    pub visibility_ratio: f64,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            predictive: true,
            threshold: 0.75,
            min_predictive_threshold: 0.5,
            velocity_trigger_factor: 0.1,
            scroll_debounce_ms: 150,
            deadband_px: 2.0,
            velocity_smoothing: 0.2,
            medium_velocity: 1.0,
            high_velocity: 2.5,
            max_depth: 3,
            cache_ttl_ms: 300_000,
            visibility_ratio: 0.5,
        }
    }
}

impl PrefetchConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }
}
