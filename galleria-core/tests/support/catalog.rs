use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use galleria_contracts::{CatalogError, CatalogQuery};
use galleria_core::catalog::InMemoryCatalog;
use galleria_model::{Cursor, GalleryFilters, ItemId, MediaItem, PageResult};
use mockall::mock;
use tokio::sync::Semaphore;

mock! {
    pub Catalog {}

    #[async_trait]
    impl CatalogQuery for Catalog {
        async fn fetch_page(
            &self,
            filters: &GalleryFilters,
            cursor: Option<Cursor>,
            limit: usize,
        ) -> Result<PageResult, CatalogError>;
    }
}

/// In-memory catalog whose responses are held until the test releases them.
///
/// Each `fetch_page` call consumes one permit; calls without a permit wait.
/// By default the page is computed after the permit is granted, so catalog
/// mutations made while a request is parked are visible in its response.
pub struct GatedCatalog {
    inner: InMemoryCatalog,
    gate: Semaphore,
    started: AtomicUsize,
    answer_first: bool,
}

impl GatedCatalog {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            inner: InMemoryCatalog::new(items),
            gate: Semaphore::new(0),
            started: AtomicUsize::new(0),
            answer_first: false,
        }
    }

    /// Compute each page on arrival and hold it at the gate, like a response
    /// still travelling over the network when the catalog changes.
    pub fn answering_first(items: Vec<MediaItem>) -> Self {
        Self {
            answer_first: true,
            ..Self::new(items)
        }
    }

    pub fn release(&self, responses: usize) {
        self.gate.add_permits(responses);
    }

    /// Calls that have entered `fetch_page`, answered or not.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn trash(&self, id: ItemId) -> bool {
        self.inner.trash(id)
    }

    /// Yield until `count` calls have entered `fetch_page`.
    pub async fn wait_for_calls(&self, count: usize) {
        while self.started() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl CatalogQuery for GatedCatalog {
    async fn fetch_page(
        &self,
        filters: &GalleryFilters,
        cursor: Option<Cursor>,
        limit: usize,
    ) -> Result<PageResult, CatalogError> {
        let early = if self.answer_first {
            Some(self.inner.fetch_page(filters, cursor.clone(), limit).await)
        } else {
            None
        };
        self.started.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| CatalogError::transport("gate closed"))?;
        permit.forget();
        match early {
            Some(page) => page,
            None => self.inner.fetch_page(filters, cursor, limit).await,
        }
    }
}
