//! Scroll telemetry and the prefetch decision.
//!
//! Everything here is synchronous and deterministic: the planner folds one
//! scroll sample at a time into its telemetry and answers whether a sweep
//! should run and how deep it should go. Rate limiting happens in the
//! manager, not here.

use galleria_config::PrefetchConfig;
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    #[default]
    Idle,
}

/// One reading of the scroll container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSample {
    pub at: Instant,
    /// Offset of the viewport top from the content top (px).
    pub position: f64,
    /// Visible height (px).
    pub viewport: f64,
    /// Total scrollable content height (px).
    pub content: f64,
}

impl ScrollSample {
    pub fn new(at: Instant, position: f64, viewport: f64, content: f64) -> Self {
        Self {
            at,
            position,
            viewport,
            content,
        }
    }

    /// Position as a share of the scrollable range, within `[0, 1]`. Content
    /// that fits the viewport counts as fully scrolled.
    pub fn fraction(&self) -> f64 {
        let range = self.content - self.viewport;
        if range <= 0.0 || !range.is_finite() {
            return 1.0;
        }
        (self.position / range).clamp(0.0, 1.0)
    }
}

/// Velocities are in px/ms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScrollMetrics {
    pub last_position: f64,
    pub direction: ScrollDirection,
    pub velocity: f64,
    pub smoothed_velocity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefetchDecision {
    pub should_prefetch: bool,
    /// Pages to fetch ahead when `should_prefetch` is set.
    pub depth: usize,
    pub fraction: f64,
    /// Scroll fraction at which this sample would have triggered.
    pub trigger_point: f64,
    pub metrics: ScrollMetrics,
}

#[derive(Debug, Clone)]
pub struct PrefetchPlanner {
    config: PrefetchConfig,
    metrics: ScrollMetrics,
    last_at: Option<Instant>,
}

impl PrefetchPlanner {
    pub fn new(config: PrefetchConfig) -> Self {
        Self {
            config,
            metrics: ScrollMetrics::default(),
            last_at: None,
        }
    }

    pub fn metrics(&self) -> ScrollMetrics {
        self.metrics
    }

    pub fn reset(&mut self) {
        self.metrics = ScrollMetrics::default();
        self.last_at = None;
    }

    /// Fold `sample` into the telemetry and decide on a sweep.
    pub fn observe(&mut self, sample: ScrollSample) -> PrefetchDecision {
        self.update_metrics(&sample);

        let fraction = sample.fraction();
        let trigger_point = self.trigger_point();
        PrefetchDecision {
            should_prefetch: self.config.enabled && fraction >= trigger_point,
            depth: self.depth(),
            fraction,
            trigger_point,
            metrics: self.metrics,
        }
    }

    fn update_metrics(&mut self, sample: &ScrollSample) {
        let Some(last_at) = self.last_at.replace(sample.at) else {
            self.metrics.last_position = sample.position;
            return;
        };

        let delta = sample.position - self.metrics.last_position;
        self.metrics.last_position = sample.position;

        let elapsed_ms =
            sample.at.saturating_duration_since(last_at).as_secs_f64() * 1000.0;
        let (direction, velocity) = if delta.abs() < self.config.deadband_px {
            (ScrollDirection::Idle, 0.0)
        } else if elapsed_ms <= 0.0 {
            // Same instant; keep the previous speed estimate.
            (direction_of(delta), self.metrics.velocity)
        } else {
            (direction_of(delta), delta.abs() / elapsed_ms)
        };

        let alpha = self.config.velocity_smoothing;
        self.metrics.direction = direction;
        self.metrics.velocity = velocity;
        self.metrics.smoothed_velocity =
            alpha * velocity + (1.0 - alpha) * self.metrics.smoothed_velocity;
    }

    fn trigger_point(&self) -> f64 {
        let config = &self.config;
        if config.predictive && self.metrics.direction == ScrollDirection::Down {
            let pulled = config.threshold
                - config.velocity_trigger_factor * self.metrics.smoothed_velocity;
            pulled.max(config.min_predictive_threshold).min(config.threshold)
        } else {
            config.threshold
        }
    }

    fn depth(&self) -> usize {
        let config = &self.config;
        let speed = self.metrics.smoothed_velocity;
        let max_depth = config.max_depth.max(1);
        if speed >= config.high_velocity {
            max_depth
        } else if speed >= config.medium_velocity {
            2.min(max_depth)
        } else {
            1
        }
    }
}

fn direction_of(delta: f64) -> ScrollDirection {
    if delta > 0.0 {
        ScrollDirection::Down
    } else {
        ScrollDirection::Up
    }
}
