use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use galleria_core::ordering::is_strictly_ordered;
use galleria_model::{GalleryFilters, ItemId, MediaItem};
use uuid::Uuid;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Deterministic id for item `n`.
pub fn item_id(n: u32) -> ItemId {
    ItemId(Uuid::from_u128(u128::from(n) + 1))
}

/// `count` items whose publish times repeat in threes, so every page
/// boundary exercises the id tie-break.
pub fn numbered_items(count: u32) -> Vec<MediaItem> {
    (0..count)
        .map(|n| {
            MediaItem::new(item_id(n))
                .with_title(format!("clip {n:03}"))
                .with_creator(if n % 2 == 0 { "ada" } else { "grace" })
                .with_platform("tiktok")
                .with_published_at(epoch() + Duration::hours(i64::from(n / 3)))
                .with_size_bytes(u64::from(n) * 1_000)
        })
        .collect()
}

pub fn published(n: u32, hours: i64) -> MediaItem {
    MediaItem::new(item_id(n)).with_published_at(epoch() + Duration::hours(hours))
}

pub fn assert_unique(items: &[MediaItem]) {
    let ids: HashSet<ItemId> = items.iter().map(|item| item.id).collect();
    assert_eq!(ids.len(), items.len(), "duplicate ids in session items");
}

pub fn assert_ordered(items: &[MediaItem], filters: &GalleryFilters) {
    assert!(
        is_strictly_ordered(items, filters),
        "items are not ordered by {} {}",
        filters.sort_by,
        filters.sort_order
    );
}
