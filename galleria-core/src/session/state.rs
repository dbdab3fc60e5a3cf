use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use galleria_model::{Cursor, GalleryFilters, ItemId, MediaItem};

use crate::error::GalleryError;
use crate::ordering::compare_items;

/// Coarse lifecycle phase derived from the session flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing loaded since construction or the last clear.
    Idle,
    Loading,
    LoadingMore,
    Ready,
    /// Every page has been loaded.
    Exhausted,
    Error,
}

/// Why `load_more` returned without touching the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyLoading,
    InitialLoadPending,
    Exhausted,
    NoCursor,
}

/// Result of one foreground session operation.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The first page replaced the item list.
    Replaced { items: usize, has_more: bool },
    /// A further page was appended. `duplicates` counts items dropped because
    /// they were already present or sorted before the current tail.
    Appended { added: usize, duplicates: usize },
    Skipped(SkipReason),
    /// The response arrived after the filters changed and was dropped.
    Discarded,
    /// The cursor was rejected; pagination restarted from the head.
    Restarted(GalleryError),
    Failed(GalleryError),
}

impl LoadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            LoadOutcome::Replaced { .. }
                | LoadOutcome::Appended { .. }
                | LoadOutcome::Restarted(_)
        )
    }
}

/// Mutable state behind a session. Only the session itself writes it.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub items: Arc<Vec<MediaItem>>,
    pub ids: HashSet<ItemId>,
    pub cursor: Option<Cursor>,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<GalleryError>,
    pub filters: GalleryFilters,
    pub generation: u64,
    pub loaded: bool,
}

impl SessionState {
    pub fn is_generation(&self, generation: u64) -> bool {
        self.generation == generation
    }

    fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.items = Arc::new(Vec::new());
        self.ids.clear();
        self.cursor = None;
        self.has_more = false;
        self.loading = false;
        self.loading_more = false;
        self.error = None;
        self.loaded = false;
    }

    /// Start a fresh first-page load under a new generation.
    pub fn begin_load(&mut self, filters: GalleryFilters) -> u64 {
        self.reset();
        self.filters = filters;
        self.loading = true;
        self.generation
    }

    pub fn clear(&mut self) {
        self.reset();
    }

    /// Reserve the next page for one `load_more` call.
    pub fn claim_next_page(
        &mut self,
    ) -> Result<(u64, GalleryFilters, Cursor), SkipReason> {
        if self.loading {
            return Err(SkipReason::InitialLoadPending);
        }
        if self.loading_more {
            return Err(SkipReason::AlreadyLoading);
        }
        if !self.has_more {
            return Err(SkipReason::Exhausted);
        }
        let Some(cursor) = self.cursor.clone() else {
            return Err(SkipReason::NoCursor);
        };
        self.loading_more = true;
        self.error = None;
        Ok((self.generation, self.filters.clone(), cursor))
    }

    /// Append items that are new and sort strictly after the current tail.
    /// Returns `(added, dropped)`.
    pub fn append(&mut self, incoming: Vec<MediaItem>) -> (usize, usize) {
        let sort_by = self.filters.sort_by;
        let order = self.filters.sort_order;
        let items = Arc::make_mut(&mut self.items);
        let (mut added, mut dropped) = (0, 0);

        for item in incoming {
            let in_order = items.last().is_none_or(|tail| {
                compare_items(tail, &item, sort_by, order) == Ordering::Less
            });
            if in_order && self.ids.insert(item.id) {
                items.push(item);
                added += 1;
            } else {
                dropped += 1;
            }
        }
        (added, dropped)
    }

    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Loading
        } else if self.loading_more {
            SessionPhase::LoadingMore
        } else if self.error.is_some() {
            SessionPhase::Error
        } else if !self.loaded {
            SessionPhase::Idle
        } else if self.has_more {
            SessionPhase::Ready
        } else {
            SessionPhase::Exhausted
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            items: Arc::clone(&self.items),
            cursor: self.cursor.clone(),
            has_more: self.has_more,
            loading: self.loading,
            loading_more: self.loading_more,
            error: self.error.clone(),
            filters: self.filters.clone(),
            generation: self.generation,
            phase: self.phase(),
        }
    }
}

/// Read-only view of a session, cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub items: Arc<Vec<MediaItem>>,
    pub cursor: Option<Cursor>,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<GalleryError>,
    pub filters: GalleryFilters,
    pub generation: u64,
    pub phase: SessionPhase,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        SessionState::default().snapshot()
    }
}

impl SessionSnapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().map(|item| item.id)
    }
}
