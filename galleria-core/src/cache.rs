//! Time-bounded page cache with in-flight request coalescing.
//!
//! Pages are keyed by the filter fingerprint that produced them plus the
//! cursor they continue from, so galleries with different filters can share
//! one cache without reading each other's pages. Foreground loads and
//! background prefetches go through [`PageCache::fetch_or_join`]; a second
//! caller asking for a page that is already being fetched waits for that
//! fetch instead of issuing its own.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use galleria_contracts::CatalogError;
use galleria_model::{Cursor, GalleryFilters, PageResult};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, trace};

pub const DEFAULT_PAGE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub scope: u64,
    pub cursor: Cursor,
}

impl PageKey {
    pub fn new(filters: &GalleryFilters, cursor: Cursor) -> Self {
        Self {
            scope: filters.fingerprint(),
            cursor,
        }
    }
}

/// Where a page handed out by [`PageCache::fetch_or_join`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    /// A fresh entry was already cached.
    Cache,
    /// Another caller was fetching the same page; we waited for it.
    Joined,
    /// This caller fetched the page from the catalog.
    Network,
}

#[derive(Debug)]
struct CachedPage {
    page: PageResult,
    stored_at: Instant,
}

/// Invalidation counters a fetch is started under. A leader only stores its
/// page when neither has moved by the time the fetch completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Epoch {
    global: u64,
    scope: u64,
}

#[derive(Default)]
struct CacheState {
    pages: HashMap<PageKey, CachedPage>,
    in_flight: HashMap<PageKey, Arc<Notify>>,
    scope_epochs: HashMap<u64, u64>,
    global_epoch: u64,
}

impl CacheState {
    fn epoch(&self, scope: u64) -> Epoch {
        Epoch {
            global: self.global_epoch,
            scope: self.scope_epochs.get(&scope).copied().unwrap_or(0),
        }
    }

    /// Forget in-flight fetches matching `stale` and wake their waiters so
    /// they claim a fresh fetch instead of waiting for an outdated page.
    fn release_flights(&mut self, stale: impl Fn(&PageKey) -> bool) -> usize {
        let mut released = 0;
        self.in_flight.retain(|key, notify| {
            if stale(key) {
                notify.notify_waiters();
                released += 1;
                false
            } else {
                true
            }
        });
        released
    }
}

enum Claim {
    Cached(PageResult),
    Leader(Arc<Notify>, Epoch),
    Waiter(Arc<Notify>),
}

pub struct PageCache {
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl fmt::Debug for PageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (pages, in_flight) = self
            .state
            .try_lock()
            .map(|state| (state.pages.len(), state.in_flight.len()))
            .unwrap_or((0, 0));

        f.debug_struct("PageCache")
            .field("ttl", &self.ttl)
            .field("pages", &pages)
            .field("in_flight_requests", &in_flight)
            .finish()
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_TTL)
    }
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CachedPage, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    /// Fresh page for `key`. An expired entry is evicted on the way out.
    pub fn get(&self, key: &PageKey) -> Option<PageResult> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let entry = state.pages.get(key)?;
        if self.is_fresh(entry, now) {
            return Some(entry.page.clone());
        }
        state.pages.remove(key);
        trace!(cursor = %key.cursor, "evicted expired page");
        None
    }

    pub fn contains_fresh(&self, key: &PageKey) -> bool {
        let now = Instant::now();
        self.state
            .lock()
            .pages
            .get(key)
            .is_some_and(|entry| self.is_fresh(entry, now))
    }

    /// Store a page unless a fresh one is already present. Returns whether
    /// the page was written.
    pub fn insert(&self, key: PageKey, page: PageResult) -> bool {
        let mut state = self.state.lock();
        self.store(&mut state, key, page)
    }

    fn store(&self, state: &mut CacheState, key: PageKey, page: PageResult) -> bool {
        let now = Instant::now();
        if state
            .pages
            .get(&key)
            .is_some_and(|entry| self.is_fresh(entry, now))
        {
            return false;
        }
        state.pages.insert(
            key,
            CachedPage {
                page,
                stored_at: now,
            },
        );
        true
    }

    pub fn is_in_flight(&self, key: &PageKey) -> bool {
        self.state.lock().in_flight.contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Number of stored pages, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.state.lock().pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired page. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut state = self.state.lock();
        let before = state.pages.len();
        state
            .pages
            .retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);
        before - state.pages.len()
    }

    /// Drop every page that belongs to one filter configuration.
    ///
    /// Fetches for the scope that are still running are detached: their
    /// results are not stored and callers joining them fetch again.
    pub fn invalidate_scope(&self, scope: u64) -> usize {
        let mut state = self.state.lock();
        let epoch = state.scope_epochs.entry(scope).or_default();
        *epoch = epoch.wrapping_add(1);
        let before = state.pages.len();
        state.pages.retain(|key, _| key.scope != scope);
        let removed = before - state.pages.len();
        let detached = state.release_flights(|key| key.scope == scope);
        if removed > 0 || detached > 0 {
            debug!(scope, removed, detached, "invalidated cached pages");
        }
        removed
    }

    /// Drop every page and detach every running fetch.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.global_epoch = state.global_epoch.wrapping_add(1);
        state.pages.clear();
        state.release_flights(|_| true);
    }

    /// Store `page` only if no invalidation touched its scope since `epoch`.
    fn insert_if_current(&self, key: PageKey, page: PageResult, epoch: Epoch) -> bool {
        let mut state = self.state.lock();
        if state.epoch(key.scope) != epoch {
            debug!(cursor = %key.cursor, "dropping page fetched before invalidation");
            return false;
        }
        self.store(&mut state, key, page)
    }

    fn claim(&self, key: &PageKey) -> Claim {
        let now = Instant::now();
        let mut state = self.state.lock();
        if let Some(entry) = state.pages.get(key) {
            if self.is_fresh(entry, now) {
                return Claim::Cached(entry.page.clone());
            }
            state.pages.remove(key);
        }
        if let Some(notify) = state.in_flight.get(key) {
            return Claim::Waiter(Arc::clone(notify));
        }
        let notify = Arc::new(Notify::new());
        state.in_flight.insert(key.clone(), Arc::clone(&notify));
        Claim::Leader(notify, state.epoch(key.scope))
    }

    fn is_same_flight(&self, key: &PageKey, notify: &Arc<Notify>) -> bool {
        self.state
            .lock()
            .in_flight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, notify))
    }

    async fn wait_for(&self, key: &PageKey, notify: Arc<Notify>) {
        let notified = notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        // The leader may have finished between claim and enable.
        if self.is_same_flight(key, &notify) {
            notified.await;
        }
    }

    /// Return the page for `key`, from the cache when fresh, by joining an
    /// in-flight fetch of the same key, or by running `fetch` ourselves.
    ///
    /// A successful fetch is stored before waiters are released. When the
    /// fetch we joined fails or is detached by an invalidation, the waiter
    /// runs its own fetch.
    pub async fn fetch_or_join<F, Fut>(
        &self,
        key: PageKey,
        fetch: F,
    ) -> Result<(PageResult, PageSource), CatalogError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PageResult, CatalogError>>,
    {
        let (notify, epoch) = loop {
            match self.claim(&key) {
                Claim::Cached(page) => {
                    trace!(cursor = %key.cursor, "page cache hit");
                    return Ok((page, PageSource::Cache));
                }
                Claim::Leader(notify, epoch) => break (notify, epoch),
                Claim::Waiter(notify) => {
                    debug!(cursor = %key.cursor, "joining in-flight page request");
                    self.wait_for(&key, notify).await;
                    if let Some(page) = self.get(&key) {
                        return Ok((page, PageSource::Joined));
                    }
                }
            }
        };

        let _flight = FlightGuard {
            cache: self,
            key: &key,
            notify,
        };
        let page = fetch().await?;
        self.insert_if_current(key.clone(), page.clone(), epoch);
        Ok((page, PageSource::Network))
    }
}

/// Releases the in-flight slot and wakes waiters, including when the leader
/// errors out or is dropped mid-fetch.
struct FlightGuard<'a> {
    cache: &'a PageCache,
    key: &'a PageKey,
    notify: Arc<Notify>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.cache.state.lock();
            if state
                .in_flight
                .get(self.key)
                .is_some_and(|current| Arc::ptr_eq(current, &self.notify))
            {
                state.in_flight.remove(self.key);
            }
        }
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_model::{ItemId, MediaItem, SortField, SortOrder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(cursor: &str) -> PageKey {
        PageKey::new(&GalleryFilters::default(), Cursor::new(cursor))
    }

    fn page(n: u8) -> PageResult {
        PageResult {
            items: vec![MediaItem::new(ItemId::from_bytes([n; 16]))],
            next_cursor: Some(Cursor::new(format!("after-{n}"))),
            has_more: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = PageCache::new(Duration::from_secs(300));
        cache.insert(key("a"), page(1));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get(&key("a")), Some(page(1)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&key("a")), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn first_fresh_writer_wins() {
        let cache = PageCache::default();
        assert!(cache.insert(key("a"), page(1)));
        assert!(!cache.insert(key("a"), page(2)));
        assert_eq!(cache.get(&key("a")), Some(page(1)));

        tokio::time::advance(DEFAULT_PAGE_TTL).await;
        assert!(cache.insert(key("a"), page(2)));
        assert_eq!(cache.get(&key("a")), Some(page(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_and_scope_invalidation() {
        let cache = PageCache::new(Duration::from_secs(10));
        let sorted = GalleryFilters::sorted(SortField::Title, SortOrder::Ascending);
        cache.insert(key("a"), page(1));
        tokio::time::advance(Duration::from_secs(6)).await;
        cache.insert(PageKey::new(&sorted, Cursor::new("a")), page(2));
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.invalidate_scope(sorted.fingerprint()), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn concurrent_fetches_share_one_request() {
        let cache = Arc::new(PageCache::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let leader = {
            let (cache, calls, gate) = (cache.clone(), calls.clone(), gate.clone());
            tokio::spawn(async move {
                cache
                    .fetch_or_join(key("a"), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok(page(1))
                    })
                    .await
            })
        };
        while !cache.is_in_flight(&key("a")) {
            tokio::task::yield_now().await;
        }

        let follower = {
            let (cache, calls) = (cache.clone(), calls.clone());
            tokio::spawn(async move {
                cache
                    .fetch_or_join(key("a"), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(page(9))
                    })
                    .await
            })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        let (lead_page, lead_source) = leader.await.unwrap().unwrap();
        let (follow_page, follow_source) = follower.await.unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(lead_source, PageSource::Network);
        assert_eq!(follow_source, PageSource::Joined);
        assert_eq!(lead_page, follow_page);
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn invalidation_detaches_running_fetch() {
        let cache = Arc::new(PageCache::default());
        let gate = Arc::new(Notify::new());

        let leader = {
            let (cache, gate) = (cache.clone(), gate.clone());
            tokio::spawn(async move {
                cache
                    .fetch_or_join(key("a"), || async move {
                        gate.notified().await;
                        Ok(page(1))
                    })
                    .await
            })
        };
        while !cache.is_in_flight(&key("a")) {
            tokio::task::yield_now().await;
        }
        let follower = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .fetch_or_join(key("a"), || async { Ok(page(2)) })
                    .await
            })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        cache.invalidate_scope(GalleryFilters::default().fingerprint());
        let (follow_page, follow_source) = follower.await.unwrap().unwrap();
        assert_eq!(follow_source, PageSource::Network);
        assert_eq!(follow_page, page(2));

        gate.notify_one();
        let (lead_page, _) = leader.await.unwrap().unwrap();
        assert_eq!(lead_page, page(1));
        assert_eq!(cache.get(&key("a")), Some(page(2)));
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn clear_discards_pages_fetched_before_it() {
        let cache = Arc::new(PageCache::default());
        let gate = Arc::new(Notify::new());
        let leader = {
            let (cache, gate) = (cache.clone(), gate.clone());
            tokio::spawn(async move {
                cache
                    .fetch_or_join(key("a"), || async move {
                        gate.notified().await;
                        Ok(page(1))
                    })
                    .await
            })
        };
        while !cache.is_in_flight(&key("a")) {
            tokio::task::yield_now().await;
        }

        cache.clear();
        gate.notify_one();
        leader.await.unwrap().unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let cache = PageCache::default();
        let err = cache
            .fetch_or_join(key("a"), || async { Err(CatalogError::Timeout) })
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::Timeout);
        assert!(!cache.is_in_flight(&key("a")));
        assert!(cache.is_empty());

        let (_, source) = cache
            .fetch_or_join(key("a"), || async { Ok(page(1)) })
            .await
            .unwrap();
        assert_eq!(source, PageSource::Network);
        let (_, source) = cache
            .fetch_or_join(key("a"), || async { Ok(page(2)) })
            .await
            .unwrap();
        assert_eq!(source, PageSource::Cache);
    }
}
