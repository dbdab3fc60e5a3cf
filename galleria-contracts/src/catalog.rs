use async_trait::async_trait;
use galleria_model::{Cursor, GalleryFilters, PageResult};

use crate::error::CatalogError;

/// Executes filtered, sorted lookups against the catalog.
///
/// Implementations must guarantee that chaining `next_cursor` values yields
/// disjoint pages that together cover the whole result set (absent
/// mutation), that soft-deleted items are excluded once flagged, and that
/// the order is total: the active sort field first, the item id second.
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    /// Fetch up to `limit` items strictly after `cursor`, or from the head of
    /// the result set when `cursor` is `None`.
    async fn fetch_page(
        &self,
        filters: &GalleryFilters,
        cursor: Option<Cursor>,
        limit: usize,
    ) -> Result<PageResult, CatalogError>;
}

#[async_trait]
impl<T> CatalogQuery for std::sync::Arc<T>
where
    T: CatalogQuery + ?Sized,
{
    async fn fetch_page(
        &self,
        filters: &GalleryFilters,
        cursor: Option<Cursor>,
        limit: usize,
    ) -> Result<PageResult, CatalogError> {
        (**self).fetch_page(filters, cursor, limit).await
    }
}
