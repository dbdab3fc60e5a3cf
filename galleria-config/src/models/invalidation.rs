use std::time::Duration;

use galleria_model::MutationKind;
use serde::{Deserialize, Serialize};

fn default_kinds() -> Vec<MutationKind> {
    MutationKind::catalog_mutating().to_vec()
}

/// Settings for the live invalidation bridge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InvalidationConfig {
    /// Quiet window (ms) after the last mutation event before the bound
    /// session refreshes. Bursts inside the window coalesce into one refresh.
    pub debounce_ms: u64,
    /// Event kinds that schedule a refresh; anything else is ignored.
    #[serde(default = "default_kinds")]
    pub kinds: Vec<MutationKind>,
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            kinds: default_kinds(),
        }
    }
}

impl InvalidationConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn reacts_to(&self, kind: MutationKind) -> bool {
        self.kinds.contains(&kind)
    }
}
