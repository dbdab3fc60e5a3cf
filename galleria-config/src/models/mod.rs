pub mod invalidation;
pub mod pagination;
pub mod prefetch;

pub use invalidation::InvalidationConfig;
pub use pagination::PaginationConfig;
pub use prefetch::PrefetchConfig;

use serde::{Deserialize, Serialize};

/// Top-level gallery settings. Every section falls back to its defaults
/// when omitted, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub pagination: PaginationConfig,
    pub prefetch: PrefetchConfig,
    pub invalidation: InvalidationConfig,
}
