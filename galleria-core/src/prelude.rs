//! Everything needed to wire a gallery view in one import.

pub use crate::cache::{PageCache, PageKey, PageSource};
pub use crate::catalog::{BroadcastMutationFeed, InMemoryCatalog};
pub use crate::cursor::{CursorDecodeError, CursorPosition};
pub use crate::error::GalleryError;
pub use crate::invalidation::{InvalidationBridge, InvalidationHandle, Refresh};
pub use crate::prefetch::{
    PrefetchDiagnostics, PrefetchManager, PrefetchPhase, ScrollSample,
    SweepReport, SweepStop, VisibleItem,
};
pub use crate::session::{
    LoadOutcome, PaginationSession, SessionPhase, SessionSnapshot, SkipReason,
};
pub use galleria_config::GalleryConfig;
pub use galleria_contracts::prelude::*;
