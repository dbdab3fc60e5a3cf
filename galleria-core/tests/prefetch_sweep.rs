//! Prefetch sweeps populate the shared cache and never disturb the session.

mod support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use galleria_config::{GalleryConfig, PaginationConfig};
use galleria_contracts::CatalogError;
use galleria_core::catalog::InMemoryCatalog;
use galleria_core::cursor;
use galleria_core::ordering::sort_items;
use galleria_core::prefetch::{
    PrefetchManager, PrefetchPhase, ScrollSample, SweepReport, SweepStop,
    VisibleItem,
};
use galleria_core::session::{LoadOutcome, PaginationSession};
use galleria_core::{GalleryError, PageCache, PageKey};
use galleria_model::{Cursor, GalleryFilters};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use support::catalog::{GatedCatalog, MockCatalog};
use support::fixtures::{assert_ordered, assert_unique, numbered_items};

const VIEWPORT: f64 = 800.0;
const CONTENT: f64 = 10_800.0;

struct Gallery {
    catalog: Arc<InMemoryCatalog>,
    cache: Arc<PageCache>,
    session: PaginationSession,
    manager: PrefetchManager,
}

async fn loaded_gallery(items: u32) -> Gallery {
    let config = GalleryConfig::default();
    let catalog = Arc::new(InMemoryCatalog::new(numbered_items(items)));
    let cache = Arc::new(PageCache::new(config.prefetch.cache_ttl()));
    let session = PaginationSession::with_cache(
        catalog.clone(),
        &config.pagination,
        cache.clone(),
    );
    let manager = PrefetchManager::new(catalog.clone(), cache.clone(), &config);

    session.load(GalleryFilters::default()).await;
    manager.attach(session.clone());
    Gallery {
        catalog,
        cache,
        session,
        manager,
    }
}

fn at(base: Instant, ms: u64, position: f64) -> ScrollSample {
    ScrollSample::new(base + Duration::from_millis(ms), position, VIEWPORT, CONTENT)
}

#[tokio::test]
async fn fast_scroll_sweeps_three_pages_ahead() -> Result<()> {
    let gallery = loaded_gallery(200).await;
    let base = Instant::now();

    assert!(gallery.manager.on_scroll(at(base, 0, 0.0), None).is_none());
    let sweep = gallery
        .manager
        .on_scroll(at(base, 150, 6_000.0), None)
        .context("fast downward scroll should start a sweep")?;
    let report = sweep.await?;

    assert_eq!(report.depth, 3);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.stop, SweepStop::DepthReached);
    assert_eq!(gallery.cache.len(), 3);
    assert_eq!(gallery.catalog.fetch_count(), 4);
    assert_eq!(gallery.manager.phase(), PrefetchPhase::Attached);

    for _ in 0..3 {
        assert_eq!(
            gallery.session.load_more().await,
            LoadOutcome::Appended {
                added: 20,
                duplicates: 0
            }
        );
    }
    assert_eq!(gallery.catalog.fetch_count(), 4, "session reused prefetched pages");

    let snapshot = gallery.session.snapshot();
    assert_eq!(snapshot.len(), 80);
    assert_unique(&snapshot.items);
    assert_ordered(&snapshot.items, &snapshot.filters);
    Ok(())
}

#[tokio::test]
async fn slow_scroll_past_threshold_sweeps_one_page() -> Result<()> {
    let gallery = loaded_gallery(200).await;
    let base = Instant::now();

    gallery.manager.on_scroll(at(base, 0, 7_000.0), None);
    let report = gallery
        .manager
        .on_scroll(at(base, 200, 7_640.0), None)
        .context("threshold crossed")?
        .await?;

    assert_eq!(report.depth, 1);
    assert_eq!(report.fetched, 1);
    assert_eq!(gallery.cache.len(), 1);
    Ok(())
}

#[tokio::test]
async fn samples_inside_debounce_window_are_dropped() -> Result<()> {
    let gallery = loaded_gallery(200).await;
    let base = Instant::now();

    gallery.manager.on_scroll(at(base, 0, 0.0), None);
    assert!(
        gallery
            .manager
            .on_scroll(at(base, 100, 9_000.0), None)
            .is_none()
    );
    let metrics = gallery.manager.diagnostics().scroll_metrics;
    assert_eq!(metrics.last_position, 0.0);
    assert_eq!(gallery.catalog.fetch_count(), 1);
    Ok(())
}

#[tokio::test]
async fn sweep_stops_when_catalog_is_exhausted() -> Result<()> {
    let gallery = loaded_gallery(50).await;
    let start = gallery.session.cursor().context("first page has a cursor")?;

    let report = gallery
        .manager
        .sweep(&GalleryFilters::default(), start, 3)
        .await;
    assert_eq!(report.fetched, 2);
    assert_eq!(report.stop, SweepStop::Exhausted);
    Ok(())
}

#[tokio::test]
async fn cached_pages_are_reused_by_later_sweeps() -> Result<()> {
    let gallery = loaded_gallery(200).await;
    let filters = GalleryFilters::default();
    let start = gallery.session.cursor().context("first page has a cursor")?;

    gallery.manager.sweep(&filters, start.clone(), 2).await;
    let report = gallery.manager.sweep(&filters, start.clone(), 3).await;

    assert_eq!(report.reused, 2);
    assert_eq!(report.fetched, 1);
    assert!(gallery.cache.contains_fresh(&PageKey::new(&filters, start)));
    Ok(())
}

#[tokio::test]
async fn layout_anchor_overrides_session_cursor() -> Result<()> {
    let gallery = loaded_gallery(200).await;
    let snapshot = gallery.session.snapshot();
    let sort_by = snapshot.filters.sort_by;

    let rendered: Vec<VisibleItem> = snapshot
        .items
        .iter()
        .enumerate()
        .map(|(n, item)| VisibleItem::new(cursor::encode(item, sort_by), n as f64 * 400.0, 400.0))
        .collect();

    let base = Instant::now();
    gallery.manager.on_scroll_with_layout(at(base, 0, 0.0), &rendered);
    // Viewport 5100..5900: item 13 fully inside, item 14 at 75%.
    let report = gallery
        .manager
        .on_scroll_with_layout(at(base, 150, 5_100.0), &rendered)
        .context("fast scroll triggers")?
        .await?;
    assert_eq!(report.fetched, 3);

    let anchored = cursor::encode(&snapshot.items[14], sort_by);
    assert!(gallery.cache.contains_fresh(&PageKey::new(&snapshot.filters, anchored)));
    let session_cursor = snapshot.cursor.clone().context("session cursor")?;
    assert!(!gallery.cache.contains_fresh(&PageKey::new(&snapshot.filters, session_cursor)));
    Ok(())
}

#[tokio::test]
async fn failed_prefetch_stays_out_of_the_session() -> Result<()> {
    let config = GalleryConfig::default();
    let healthy = Arc::new(InMemoryCatalog::new(numbered_items(100)));
    let cache = Arc::new(PageCache::new(config.prefetch.cache_ttl()));
    let session =
        PaginationSession::with_cache(healthy.clone(), &config.pagination, cache.clone());

    let mut broken = MockCatalog::new();
    broken.expect_fetch_page().times(1).returning(|_, _, _| {
        Err(CatalogError::Service {
            status: 503,
            message: "unavailable".to_string(),
        })
    });
    let manager = PrefetchManager::new(Arc::new(broken), cache.clone(), &config);

    session.load(GalleryFilters::default()).await;
    let start = session.cursor().context("first page has a cursor")?;
    let report = manager.sweep(&session.filters(), start, 3).await;

    assert!(matches!(report.stop, SweepStop::Failed(GalleryError::Prefetch(_))));
    assert_eq!(report.pages(), 0);
    assert!(cache.is_empty());

    let snapshot = session.snapshot();
    assert_eq!(snapshot.error, None);
    assert!(session.load_more().await.is_applied());
    assert_eq!(session.snapshot().len(), 40);
    Ok(())
}

#[tokio::test]
async fn detached_manager_ignores_scrolls() -> Result<()> {
    let gallery = loaded_gallery(200).await;
    gallery.manager.detach();
    assert_eq!(gallery.manager.phase(), PrefetchPhase::Idle);

    let base = Instant::now();
    gallery.manager.on_scroll(at(base, 0, 0.0), None);
    assert!(
        gallery
            .manager
            .on_scroll(at(base, 150, 6_000.0), None)
            .is_none()
    );

    let diagnostics = gallery.manager.diagnostics();
    assert!(!diagnostics.is_active);
    assert_eq!(diagnostics.active_prefetches, 0);
    assert_eq!(diagnostics.cache_size, 0);
    Ok(())
}

struct GatedGallery {
    catalog: Arc<GatedCatalog>,
    cache: Arc<PageCache>,
    session: PaginationSession,
    manager: PrefetchManager,
}

async fn gated_gallery(catalog: GatedCatalog) -> GatedGallery {
    let config = GalleryConfig::default();
    let catalog = Arc::new(catalog);
    let cache = Arc::new(PageCache::new(config.prefetch.cache_ttl()));
    let session = PaginationSession::with_cache(
        catalog.clone(),
        &config.pagination,
        cache.clone(),
    );
    let manager = PrefetchManager::new(catalog.clone(), cache.clone(), &config);

    catalog.release(1);
    session.load(GalleryFilters::default()).await;
    manager.attach(session.clone());
    GatedGallery {
        catalog,
        cache,
        session,
        manager,
    }
}

fn spawn_sweep(
    manager: &PrefetchManager,
    filters: GalleryFilters,
    start: Cursor,
) -> JoinHandle<SweepReport> {
    let manager = manager.clone();
    tokio::spawn(async move { manager.sweep(&filters, start, 1).await })
}

#[tokio::test]
async fn load_more_joins_a_running_prefetch() -> Result<()> {
    let gallery = gated_gallery(GatedCatalog::new(numbered_items(60))).await;
    let filters = gallery.session.filters();
    let start = gallery.session.cursor().context("first page has a cursor")?;

    let sweep = spawn_sweep(&gallery.manager, filters.clone(), start.clone());
    gallery.catalog.wait_for_calls(2).await;

    let load_more = {
        let session = gallery.session.clone();
        tokio::spawn(async move { session.load_more().await })
    };
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(gallery.catalog.started(), 2, "load_more waited on the sweep");
    assert!(gallery.cache.is_in_flight(&PageKey::new(&filters, start)));

    gallery.catalog.release(1);
    assert_eq!(sweep.await?.fetched, 1);
    assert_eq!(
        load_more.await?,
        LoadOutcome::Appended {
            added: 20,
            duplicates: 0
        }
    );
    assert_eq!(gallery.catalog.started(), 2);

    let snapshot = gallery.session.snapshot();
    assert_eq!(snapshot.len(), 40);
    assert_unique(&snapshot.items);
    Ok(())
}

#[tokio::test]
async fn refresh_discards_pages_prefetched_before_it() -> Result<()> {
    let gallery = gated_gallery(GatedCatalog::answering_first(numbered_items(60))).await;
    let filters = gallery.session.filters();
    let start = gallery.session.cursor().context("first page has a cursor")?;

    let mut ordered = numbered_items(60);
    sort_items(&mut ordered, &filters);
    let victim = ordered[25].id;

    // The sweep has its answer for page two before the item is trashed.
    let sweep = spawn_sweep(&gallery.manager, filters.clone(), start.clone());
    gallery.catalog.wait_for_calls(2).await;
    assert!(gallery.catalog.trash(victim));

    gallery.catalog.release(2);
    assert!(matches!(
        gallery.session.refresh().await,
        LoadOutcome::Replaced { items: 20, .. }
    ));
    assert_eq!(gallery.session.cursor(), Some(start.clone()));
    assert_eq!(sweep.await?.fetched, 1);
    assert!(!gallery.cache.contains_fresh(&PageKey::new(&filters, start)));

    gallery.catalog.release(1);
    assert_eq!(
        gallery.session.load_more().await,
        LoadOutcome::Appended {
            added: 20,
            duplicates: 0
        }
    );
    let snapshot = gallery.session.snapshot();
    assert!(snapshot.ids().all(|id| id != victim));
    assert_ordered(&snapshot.items, &snapshot.filters);
    Ok(())
}

#[tokio::test]
async fn sweeps_use_the_attached_session_page_size() -> Result<()> {
    let mut config = GalleryConfig::default();
    config.pagination.page_limit = 50;
    let catalog = Arc::new(InMemoryCatalog::new(numbered_items(200)));
    let cache = Arc::new(PageCache::new(config.prefetch.cache_ttl()));
    let session = PaginationSession::with_cache(
        catalog.clone(),
        &PaginationConfig { page_limit: 20 },
        cache.clone(),
    );
    let manager = PrefetchManager::new(catalog.clone(), cache.clone(), &config);
    assert_eq!(manager.page_limit(), 50);

    session.load(GalleryFilters::default()).await;
    manager.attach(session.clone());
    assert_eq!(manager.page_limit(), 20);

    let start = session.cursor().context("first page has a cursor")?;
    manager.sweep(&session.filters(), start.clone(), 1).await;
    let page = cache
        .get(&PageKey::new(&session.filters(), start))
        .context("page was prefetched")?;
    assert_eq!(page.len(), 20);

    let before = catalog.fetch_count();
    assert!(session.load_more().await.is_applied());
    assert_eq!(catalog.fetch_count(), before, "load_more reused the prefetched page");
    Ok(())
}
