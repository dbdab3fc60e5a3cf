use std::cmp::Ordering;

use galleria_model::{GalleryFilters, MediaItem, SortField, SortOrder};

/// Total order used by every gallery view: the sort attribute first, the
/// item id second, both oriented by `order`.
pub fn compare_items(
    a: &MediaItem,
    b: &MediaItem,
    field: SortField,
    order: SortOrder,
) -> Ordering {
    let ascending = a
        .sort_value(field)
        .cmp(&b.sort_value(field))
        .then_with(|| a.id.cmp(&b.id));
    order.apply(ascending)
}

pub fn sort_items(items: &mut [MediaItem], filters: &GalleryFilters) {
    items.sort_by(|a, b| compare_items(a, b, filters.sort_by, filters.sort_order));
}

/// True when every item sorts strictly after its predecessor.
pub fn is_strictly_ordered(items: &[MediaItem], filters: &GalleryFilters) -> bool {
    items.windows(2).all(|pair| {
        compare_items(&pair[0], &pair[1], filters.sort_by, filters.sort_order)
            == Ordering::Less
    })
}
