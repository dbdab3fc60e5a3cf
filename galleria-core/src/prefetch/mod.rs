//! Velocity-adaptive prefetching into the shared page cache.
//!
//! The manager watches scroll samples for one gallery container and, when
//! the [`PrefetchPlanner`] says so, runs a background sweep that fetches up
//! to N pages past a continuation cursor. Sweeps only ever write to the
//! [`PageCache`]; the session picks those pages up on its next `load_more`.

mod planner;
mod visibility;

use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use galleria_config::{GalleryConfig, PrefetchConfig};
use galleria_contracts::CatalogQuery;
use galleria_model::{Cursor, GalleryFilters};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

pub use planner::{
    PrefetchDecision, PrefetchPlanner, ScrollDirection, ScrollMetrics,
    ScrollSample,
};
pub use visibility::{VisibleItem, last_visible_cursor};

use crate::cache::{PageCache, PageKey, PageSource};
use crate::error::GalleryError;
use crate::session::PaginationSession;

/// Lifecycle of a prefetch manager. `Computing` covers the decision for one
/// accepted scroll sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefetchPhase {
    Idle,
    Attached,
    Computing,
    Prefetching,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefetchDiagnostics {
    pub phase: PrefetchPhase,
    pub cache_size: usize,
    pub active_prefetches: usize,
    pub scroll_metrics: ScrollMetrics,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SweepStop {
    /// Fetched as many pages as requested.
    DepthReached,
    /// The catalog reported no further pages.
    Exhausted,
    Failed(GalleryError),
}

/// What one sweep did. Pages served from the cache or joined from another
/// in-flight request count as `reused`.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub depth: usize,
    pub fetched: usize,
    pub reused: usize,
    pub stop: SweepStop,
}

impl SweepReport {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            fetched: 0,
            reused: 0,
            stop: SweepStop::DepthReached,
        }
    }

    pub fn pages(&self) -> usize {
        self.fetched + self.reused
    }
}

#[derive(Clone)]
pub struct PrefetchManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    catalog: Arc<dyn CatalogQuery>,
    cache: Arc<PageCache>,
    config: PrefetchConfig,
    page_limit: usize,
    state: Mutex<ManagerState>,
    active: AtomicUsize,
}

struct ManagerState {
    phase: PrefetchPhase,
    planner: PrefetchPlanner,
    session: Option<PaginationSession>,
    last_sample_at: Option<Instant>,
}

impl fmt::Debug for PrefetchManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = self
            .inner
            .state
            .try_lock()
            .map(|state| state.phase)
            .unwrap_or(PrefetchPhase::Idle);

        f.debug_struct("PrefetchManager")
            .field("catalog", &type_name_of_val(self.inner.catalog.as_ref()))
            .field("cache", &self.inner.cache)
            .field("default_page_limit", &self.inner.page_limit)
            .field("phase", &phase)
            .field("active_prefetches", &self.active_prefetches())
            .finish()
    }
}

/// Counts a running sweep; returns the manager to `Attached` when the last
/// one ends, including when its task is aborted.
struct ActiveSweep {
    inner: Arc<ManagerInner>,
}

impl Drop for ActiveSweep {
    fn drop(&mut self) {
        if self.inner.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            let mut state = self.inner.state.lock();
            if state.phase == PrefetchPhase::Prefetching {
                state.phase = PrefetchPhase::Attached;
            }
        }
    }
}

impl PrefetchManager {
    pub fn new(
        catalog: Arc<dyn CatalogQuery>,
        cache: Arc<PageCache>,
        config: &GalleryConfig,
    ) -> Self {
        let prefetch = config.prefetch.clone();
        Self {
            inner: Arc::new(ManagerInner {
                catalog,
                cache,
                page_limit: config.pagination.page_limit.max(1),
                state: Mutex::new(ManagerState {
                    phase: PrefetchPhase::Idle,
                    planner: PrefetchPlanner::new(prefetch.clone()),
                    session: None,
                    last_sample_at: None,
                }),
                config: prefetch,
                active: AtomicUsize::new(0),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.inner.cache
    }

    pub fn phase(&self) -> PrefetchPhase {
        self.inner.state.lock().phase
    }

    pub fn active_prefetches(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Start watching scroll samples on behalf of `session`.
    pub fn attach(&self, session: PaginationSession) {
        let mut state = self.inner.state.lock();
        state.session = Some(session);
        state.planner.reset();
        state.last_sample_at = None;
        if state.phase == PrefetchPhase::Idle {
            state.phase = PrefetchPhase::Attached;
        }
        debug!("prefetch manager attached");
    }

    /// Stop reacting to scroll samples. Running sweeps finish on their own.
    pub fn detach(&self) {
        let mut state = self.inner.state.lock();
        state.session = None;
        state.planner.reset();
        state.last_sample_at = None;
        state.phase = PrefetchPhase::Idle;
        debug!("prefetch manager detached");
    }

    /// Feed one scroll sample. Samples closer together than the configured
    /// debounce are dropped. Returns the spawned sweep when one starts.
    ///
    /// `anchor` overrides the session cursor as the sweep's starting point.
    /// Must be called from within a tokio runtime.
    pub fn on_scroll(
        &self,
        sample: ScrollSample,
        anchor: Option<Cursor>,
    ) -> Option<JoinHandle<SweepReport>> {
        let (decision, session) = {
            let mut state = self.inner.state.lock();
            let session = state.session.clone()?;
            if let Some(last) = state.last_sample_at
                && sample.at.saturating_duration_since(last)
                    < self.inner.config.scroll_debounce()
            {
                trace!("scroll sample inside debounce window");
                return None;
            }
            state.last_sample_at = Some(sample.at);

            let resume = state.phase;
            state.phase = PrefetchPhase::Computing;
            let decision = state.planner.observe(sample);
            state.phase = resume;
            (decision, session)
        };

        if !decision.should_prefetch {
            return None;
        }
        trace!(
            fraction = decision.fraction,
            trigger_point = decision.trigger_point,
            depth = decision.depth,
            velocity = decision.metrics.smoothed_velocity,
            "prefetch triggered"
        );

        let snapshot = session.snapshot();
        if snapshot.loading || !snapshot.has_more {
            return None;
        }
        let start = anchor.or(snapshot.cursor)?;

        if self
            .inner
            .active
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            trace!("sweep already running");
            return None;
        }
        let guard = ActiveSweep {
            inner: Arc::clone(&self.inner),
        };
        self.inner.state.lock().phase = PrefetchPhase::Prefetching;

        let manager = self.clone();
        let filters = snapshot.filters;
        let depth = decision.depth;
        let limit = session.page_limit();
        Some(tokio::spawn(async move {
            let report = manager.run_sweep(&filters, start, depth, limit).await;
            drop(guard);
            report
        }))
    }

    /// Like [`PrefetchManager::on_scroll`], anchoring the sweep at the last
    /// rendered item that is mostly inside the viewport.
    pub fn on_scroll_with_layout(
        &self,
        sample: ScrollSample,
        rendered: &[VisibleItem],
    ) -> Option<JoinHandle<SweepReport>> {
        let anchor = last_visible_cursor(
            rendered,
            sample.position,
            sample.viewport,
            self.inner.config.visibility_ratio,
        )
        .cloned();
        self.on_scroll(sample, anchor)
    }

    /// Fetch up to `depth` pages after `start` into the cache.
    ///
    /// Pages are sized like the attached session's so their cursors line up
    /// with its `load_more` calls.
    pub async fn sweep(
        &self,
        filters: &GalleryFilters,
        start: Cursor,
        depth: usize,
    ) -> SweepReport {
        let limit = self.page_limit();
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        let _guard = ActiveSweep {
            inner: Arc::clone(&self.inner),
        };
        self.run_sweep(filters, start, depth, limit).await
    }

    /// Page size of the attached session, else the configured default.
    pub fn page_limit(&self) -> usize {
        self.inner
            .state
            .lock()
            .session
            .as_ref()
            .map_or(self.inner.page_limit, PaginationSession::page_limit)
    }

    async fn run_sweep(
        &self,
        filters: &GalleryFilters,
        start: Cursor,
        depth: usize,
        limit: usize,
    ) -> SweepReport {
        let purged = self.inner.cache.purge_expired();
        if purged > 0 {
            trace!(purged, "purged expired pages before sweep");
        }

        let mut report = SweepReport::new(depth);
        let mut cursor = start;
        let catalog = &self.inner.catalog;

        for _ in 0..depth {
            let key = PageKey::new(filters, cursor.clone());
            let requested = cursor.clone();
            let result = self
                .inner
                .cache
                .fetch_or_join(key, || catalog.fetch_page(filters, Some(requested), limit))
                .await;

            let page = match result {
                Ok((page, PageSource::Network)) => {
                    report.fetched += 1;
                    page
                }
                Ok((page, PageSource::Cache | PageSource::Joined)) => {
                    report.reused += 1;
                    page
                }
                Err(err) => {
                    warn!(%cursor, error = %err, "prefetch failed; stopping sweep");
                    report.stop = SweepStop::Failed(GalleryError::Prefetch(err.to_string()));
                    return report;
                }
            };

            match page.continuation() {
                Some(next) => cursor = next.clone(),
                None => {
                    report.stop = SweepStop::Exhausted;
                    break;
                }
            }
        }

        debug!(
            depth,
            fetched = report.fetched,
            reused = report.reused,
            stop = ?report.stop,
            "prefetch sweep finished"
        );
        report
    }

    pub fn diagnostics(&self) -> PrefetchDiagnostics {
        let (phase, scroll_metrics) = {
            let state = self.inner.state.lock();
            (state.phase, state.planner.metrics())
        };
        let active_prefetches = self.active_prefetches();
        PrefetchDiagnostics {
            phase,
            cache_size: self.inner.cache.len(),
            active_prefetches,
            scroll_metrics,
            is_active: active_prefetches > 0,
        }
    }
}
