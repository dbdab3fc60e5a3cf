use std::fmt;

use thiserror::Error;

use crate::models::GalleryConfig;

/// Settings that cannot produce a working gallery.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigGuardRailError {
    #[error("pagination.page_limit must be at least 1")]
    ZeroPageLimit,

    #[error("prefetch.max_depth must be at least 1")]
    ZeroPrefetchDepth,

    #[error("prefetch.{field} must lie within [0, 1] (got {value})")]
    FractionOutOfRange { field: &'static str, value: f64 },

    #[error(
        "prefetch.medium_velocity ({medium}) must not exceed prefetch.high_velocity ({high})"
    )]
    VelocityThresholdsInverted { medium: f64, high: f64 },

    #[error("prefetch.cache_ttl_ms must be greater than zero")]
    ZeroCacheTtl,
}

/// A setting that works but is probably not what the operator intended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.items.push(ConfigWarning {
            field,
            message: message.into(),
        });
    }
}

impl GalleryConfig {
    /// Reject impossible settings and collect soft warnings for odd ones.
    pub fn validate(&self) -> Result<ConfigWarnings, ConfigGuardRailError> {
        let prefetch = &self.prefetch;

        if self.pagination.page_limit == 0 {
            return Err(ConfigGuardRailError::ZeroPageLimit);
        }
        if prefetch.max_depth == 0 {
            return Err(ConfigGuardRailError::ZeroPrefetchDepth);
        }
        if prefetch.cache_ttl_ms == 0 {
            return Err(ConfigGuardRailError::ZeroCacheTtl);
        }
        for (field, value) in [
            ("threshold", prefetch.threshold),
            ("min_predictive_threshold", prefetch.min_predictive_threshold),
            ("velocity_smoothing", prefetch.velocity_smoothing),
            ("visibility_ratio", prefetch.visibility_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigGuardRailError::FractionOutOfRange {
                    field,
                    value,
                });
            }
        }
        if prefetch.medium_velocity > prefetch.high_velocity {
            return Err(ConfigGuardRailError::VelocityThresholdsInverted {
                medium: prefetch.medium_velocity,
                high: prefetch.high_velocity,
            });
        }

        let mut warnings = ConfigWarnings::default();
        if self.pagination.page_limit > 500 {
            warnings.push(
                "pagination.page_limit",
                format!(
                    "{} items per page will make every load_more slow",
                    self.pagination.page_limit
                ),
            );
        }
        if prefetch.min_predictive_threshold > prefetch.threshold {
            warnings.push(
                "prefetch.min_predictive_threshold",
                "above prefetch.threshold; predictive triggering never fires early",
            );
        }
        if prefetch.velocity_smoothing == 0.0 {
            warnings.push(
                "prefetch.velocity_smoothing",
                "zero smoothing weight freezes the velocity estimate",
            );
        }
        if self.invalidation.kinds.is_empty() {
            warnings.push(
                "invalidation.kinds",
                "no mutation kinds configured; sessions never auto-refresh",
            );
        }
        if self.invalidation.debounce_ms == 0 {
            warnings.push(
                "invalidation.debounce_ms",
                "zero debounce refreshes once per mutation event",
            );
        }
        Ok(warnings)
    }
}
