use std::fmt;

use uuid::Uuid;

use crate::chrono::{DateTime, Utc};
use crate::ids::ItemId;

/// Kind of server-side catalog mutation announced over the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MutationKind {
    Trash,
    Restore,
    BulkEdit,
    Reanalysis,
    Other,
}

impl MutationKind {
    /// Kinds that change which items a gallery shows or in what order.
    pub fn catalog_mutating() -> &'static [MutationKind] {
        use MutationKind::*;
        &[Trash, Restore, BulkEdit, Reanalysis]
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            MutationKind::Trash => "trash",
            MutationKind::Restore => "restore",
            MutationKind::BulkEdit => "bulk_edit",
            MutationKind::Reanalysis => "reanalysis",
            MutationKind::Other => "other",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

/// A catalog mutation pushed by the server.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MutationEvent {
    pub event_id: Uuid,
    pub kind: MutationKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub item_ids: Vec<ItemId>,
    pub emitted_at: DateTime<Utc>,
}

impl MutationEvent {
    pub fn new(kind: MutationKind, item_ids: Vec<ItemId>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            kind,
            item_ids,
            emitted_at: Utc::now(),
        }
    }
}
