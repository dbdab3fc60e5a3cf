//! Foreground pagination for one gallery view.
//!
//! A [`PaginationSession`] owns the ordered, duplicate-free item list a view
//! renders. Every operation bumps or checks a generation counter so that a
//! response arriving after the filters changed is dropped instead of mixing
//! two result sets. State lives behind a short synchronous lock that is never
//! held across a catalog call; observers follow changes through
//! [`PaginationSession::subscribe`].

mod state;

use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use galleria_config::PaginationConfig;
use galleria_contracts::{CatalogError, CatalogQuery};
use galleria_model::{Cursor, FilterPatch, GalleryFilters, PageResult};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

pub use state::{LoadOutcome, SessionPhase, SessionSnapshot, SkipReason};

use crate::cache::{PageCache, PageKey, PageSource};
use crate::cursor;
use crate::error::GalleryError;
use state::SessionState;

/// Cheaply clonable handle to one gallery's pagination state.
#[derive(Clone)]
pub struct PaginationSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    catalog: Arc<dyn CatalogQuery>,
    cache: Option<Arc<PageCache>>,
    page_limit: usize,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
}

enum Settled {
    Done(LoadOutcome),
    Restart(GalleryError),
}

impl fmt::Debug for PaginationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (generation, items) = self
            .inner
            .state
            .try_lock()
            .map(|state| (state.generation, state.items.len()))
            .unwrap_or_default();

        f.debug_struct("PaginationSession")
            .field("catalog", &type_name_of_val(self.inner.catalog.as_ref()))
            .field("page_limit", &self.inner.page_limit)
            .field("shared_cache", &self.inner.cache.is_some())
            .field("generation", &generation)
            .field("items", &items)
            .finish()
    }
}

impl PaginationSession {
    pub fn new(catalog: Arc<dyn CatalogQuery>, config: &PaginationConfig) -> Self {
        Self::build(catalog, config, None)
    }

    /// Session that reads and fills a page cache shared with a prefetcher.
    pub fn with_cache(
        catalog: Arc<dyn CatalogQuery>,
        config: &PaginationConfig,
        cache: Arc<PageCache>,
    ) -> Self {
        Self::build(catalog, config, Some(cache))
    }

    fn build(
        catalog: Arc<dyn CatalogQuery>,
        config: &PaginationConfig,
        cache: Option<Arc<PageCache>>,
    ) -> Self {
        let (updates, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(SessionInner {
                catalog,
                cache,
                page_limit: config.page_limit.max(1),
                state: Mutex::new(SessionState::default()),
                updates,
            }),
        }
    }

    pub fn page_limit(&self) -> usize {
        self.inner.page_limit
    }

    pub fn cache(&self) -> Option<&Arc<PageCache>> {
        self.inner.cache.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Receiver that observes every state change, starting from the current
    /// snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn filters(&self) -> GalleryFilters {
        self.inner.state.lock().filters.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.inner.state.lock().cursor.clone()
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.inner.updates.send_replace(snapshot);
    }

    fn publish_current(&self) {
        let snapshot = self.snapshot();
        self.publish(snapshot);
    }

    /// Replace the gallery with the first page for `filters`.
    ///
    /// The previous items, cursor and error are cleared before the request
    /// is issued.
    pub async fn load(&self, filters: GalleryFilters) -> LoadOutcome {
        let generation = {
            let mut state = self.inner.state.lock();
            state.begin_load(filters.clone())
        };
        self.publish_current();
        debug!(
            generation,
            sort_by = %filters.sort_by,
            sort_order = %filters.sort_order,
            "loading first page"
        );

        let result = self
            .inner
            .catalog
            .fetch_page(&filters, None, self.inner.page_limit)
            .await;
        self.settle_first_page(generation, result)
    }

    fn settle_first_page(
        &self,
        generation: u64,
        result: Result<PageResult, CatalogError>,
    ) -> LoadOutcome {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if !state.is_generation(generation) {
            let stale = GalleryError::StaleResponse {
                generation,
                current: state.generation,
            };
            debug!(%stale, "discarding first page");
            return LoadOutcome::Discarded;
        }

        state.loading = false;
        let outcome = match result {
            Ok(page) => {
                let (items, dropped) = state.append(page.items);
                if dropped > 0 {
                    warn!(dropped, "first page contained duplicate or unordered items");
                }
                state.cursor = page.next_cursor;
                state.has_more = page.has_more;
                state.loaded = true;
                info!(generation, items, has_more = state.has_more, "gallery loaded");
                LoadOutcome::Replaced {
                    items,
                    has_more: state.has_more,
                }
            }
            Err(err) => {
                let error = GalleryError::from(err);
                warn!(generation, %error, "first page failed");
                state.error = Some(error.clone());
                LoadOutcome::Failed(error)
            }
        };

        let snapshot = state.snapshot();
        drop(guard);
        self.publish(snapshot);
        outcome
    }

    /// Append the next page.
    ///
    /// Returns `Skipped` without touching the catalog while a load is in
    /// progress or when nothing is left; concurrent calls are dropped, not
    /// queued.
    pub async fn load_more(&self) -> LoadOutcome {
        let claim = {
            let mut state = self.inner.state.lock();
            state.claim_next_page()
        };
        let (generation, filters, cursor) = match claim {
            Ok(claim) => claim,
            Err(reason) => {
                trace!(?reason, "load_more skipped");
                return LoadOutcome::Skipped(reason);
            }
        };
        self.publish_current();

        if let Err(err) = cursor::decode_for(&cursor, filters.sort_by) {
            return self
                .restart(generation, filters, GalleryError::CursorDecode(err))
                .await;
        }

        let result = self.fetch_next(&filters, cursor).await;
        match self.settle_next_page(generation, result) {
            Settled::Done(outcome) => outcome,
            Settled::Restart(reason) => {
                self.restart(generation, filters, reason).await
            }
        }
    }

    async fn fetch_next(
        &self,
        filters: &GalleryFilters,
        cursor: Cursor,
    ) -> Result<(PageResult, PageSource), CatalogError> {
        let limit = self.inner.page_limit;
        let catalog = &self.inner.catalog;
        match &self.inner.cache {
            Some(cache) => {
                let key = PageKey::new(filters, cursor.clone());
                cache
                    .fetch_or_join(key, || {
                        catalog.fetch_page(filters, Some(cursor), limit)
                    })
                    .await
            }
            None => catalog
                .fetch_page(filters, Some(cursor), limit)
                .await
                .map(|page| (page, PageSource::Network)),
        }
    }

    fn settle_next_page(
        &self,
        generation: u64,
        result: Result<(PageResult, PageSource), CatalogError>,
    ) -> Settled {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if !state.is_generation(generation) {
            let stale = GalleryError::StaleResponse {
                generation,
                current: state.generation,
            };
            debug!(%stale, "discarding next page");
            return Settled::Done(LoadOutcome::Discarded);
        }

        state.loading_more = false;
        let outcome = match result {
            Ok((page, source)) => {
                let (added, duplicates) = state.append(page.items);
                state.cursor = page.next_cursor;
                state.has_more = page.has_more;
                debug!(
                    generation,
                    ?source,
                    added,
                    duplicates,
                    has_more = state.has_more,
                    "appended page"
                );
                LoadOutcome::Appended { added, duplicates }
            }
            Err(err) if err.is_invalid_cursor() => {
                return Settled::Restart(GalleryError::Transport(err));
            }
            Err(err) => {
                let error = GalleryError::from(err);
                warn!(generation, %error, "next page failed; keeping loaded items");
                state.error = Some(error.clone());
                LoadOutcome::Failed(error)
            }
        };

        let snapshot = state.snapshot();
        drop(guard);
        self.publish(snapshot);
        Settled::Done(outcome)
    }

    async fn restart(
        &self,
        generation: u64,
        filters: GalleryFilters,
        reason: GalleryError,
    ) -> LoadOutcome {
        let current = self.inner.state.lock().is_generation(generation);
        if !current {
            return LoadOutcome::Discarded;
        }
        warn!(%reason, "cursor rejected; restarting pagination from the head");
        if let Some(cache) = &self.inner.cache {
            cache.invalidate_scope(filters.fingerprint());
        }
        match self.load(filters).await {
            LoadOutcome::Replaced { .. } => LoadOutcome::Restarted(reason),
            other => other,
        }
    }

    /// Drop cached pages for the current filters and reload from the head.
    pub async fn refresh(&self) -> LoadOutcome {
        let filters = self.filters();
        if let Some(cache) = &self.inner.cache {
            cache.invalidate_scope(filters.fingerprint());
        }
        info!(sort_by = %filters.sort_by, "refreshing gallery");
        self.load(filters).await
    }

    /// Merge `patch` into the active filters and reload.
    pub async fn set_filters(&self, patch: FilterPatch) -> LoadOutcome {
        let mut filters = self.filters();
        filters.apply(patch);
        self.load(filters).await
    }

    /// Forget everything loaded so far. In-flight responses are discarded
    /// when they arrive.
    pub fn clear_data(&self) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            state.clear();
            state.snapshot()
        };
        debug!(generation = snapshot.generation, "cleared gallery");
        self.publish(snapshot);
    }
}
