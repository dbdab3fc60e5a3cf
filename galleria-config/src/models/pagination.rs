use serde::{Deserialize, Serialize};

/// Page sizing for pagination sessions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Items requested per page, for both the first load and every
    /// continuation. Prefetch sweeps use the same limit so their cached pages
    /// line up with what the session would have fetched itself.
    pub page_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_limit: 20 }
    }
}
