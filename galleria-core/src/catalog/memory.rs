use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use galleria_contracts::{CatalogError, CatalogQuery};
use galleria_model::{Cursor, GalleryFilters, ItemId, MediaItem, PageResult};
use parking_lot::RwLock;
use tracing::trace;

use crate::cursor;
use crate::ordering::sort_items;

/// Catalog held in memory, paginated with the same seek semantics a
/// database-backed service uses.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<Vec<MediaItem>>,
    latency: Option<Duration>,
    fetches: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items: RwLock::new(items),
            latency: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `fetch_page` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Insert or replace by id.
    pub fn insert(&self, item: MediaItem) {
        let mut items = self.items.write();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Apply `edit` to the item with `id`. Returns false when absent.
    pub fn update(&self, id: ItemId, edit: impl FnOnce(&mut MediaItem)) -> bool {
        let mut items = self.items.write();
        match items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                edit(item);
                true
            }
            None => false,
        }
    }

    /// Soft-delete: the item stays stored but drops out of every page.
    pub fn trash(&self, id: ItemId) -> bool {
        self.update(id, |item| item.status.trashed = true)
    }

    pub fn restore(&self, id: ItemId) -> bool {
        self.update(id, |item| item.status.trashed = false)
    }

    fn page(
        &self,
        filters: &GalleryFilters,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<PageResult, CatalogError> {
        let after = cursor
            .map(|cursor| cursor::decode_for(cursor, filters.sort_by))
            .transpose()?;

        let mut matching: Vec<MediaItem> = self
            .items
            .read()
            .iter()
            .filter(|item| !item.is_trashed() && filters.matches(item))
            .filter(|item| {
                after
                    .as_ref()
                    .is_none_or(|position| position.admits(item, filters.sort_order))
            })
            .cloned()
            .collect();
        sort_items(&mut matching, filters);

        let limit = limit.max(1);
        let has_more = matching.len() > limit;
        matching.truncate(limit);
        let next_cursor = if has_more {
            matching.last().map(|last| cursor::encode(last, filters.sort_by))
        } else {
            None
        };

        Ok(PageResult {
            items: matching,
            next_cursor,
            has_more,
        })
    }
}

#[async_trait]
impl CatalogQuery for InMemoryCatalog {
    async fn fetch_page(
        &self,
        filters: &GalleryFilters,
        cursor: Option<Cursor>,
        limit: usize,
    ) -> Result<PageResult, CatalogError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let page = self.page(filters, cursor.as_ref(), limit)?;
        trace!(
            items = page.items.len(),
            has_more = page.has_more,
            "served in-memory page"
        );
        Ok(page)
    }
}
