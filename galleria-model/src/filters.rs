use std::hash::{DefaultHasher, Hash, Hasher};

use crate::item::MediaItem;
use crate::sorting::{SortField, SortOrder};

/// Restrict a gallery to items in a given edit/process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StatusFilter {
    Edited,
    Unedited,
    Processed,
    Unprocessed,
}

impl StatusFilter {
    pub fn matches(&self, item: &MediaItem) -> bool {
        match self {
            StatusFilter::Edited => item.status.edited,
            StatusFilter::Unedited => !item.status.edited,
            StatusFilter::Processed => item.status.processed,
            StatusFilter::Unprocessed => !item.status.processed,
        }
    }
}

/// Filter and sort configuration of one gallery view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GalleryFilters {
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub search: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub platform: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub creator: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub status: Option<StatusFilter>,
}

impl GalleryFilters {
    pub fn sorted(sort_by: SortField, sort_order: SortOrder) -> Self {
        Self {
            sort_by,
            sort_order,
            ..Self::default()
        }
    }

    /// Stable fingerprint of the whole configuration. Two filter sets with
    /// the same fingerprint address the same ordered sequence of pages.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Merge a partial update into this configuration.
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(sort_by) = patch.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(sort_order) = patch.sort_order {
            self.sort_order = sort_order;
        }
        if let Some(search) = patch.search {
            self.search = search.filter(|s| !s.trim().is_empty());
        }
        if let Some(platform) = patch.platform {
            self.platform = platform;
        }
        if let Some(creator) = patch.creator {
            self.creator = creator;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    /// Whether an item belongs to this view, ignoring ordering and the
    /// soft-delete flag.
    pub fn matches(&self, item: &MediaItem) -> bool {
        if let Some(platform) = &self.platform
            && item.platform.as_deref() != Some(platform.as_str())
        {
            return false;
        }
        if let Some(creator) = &self.creator
            && item.creator.as_deref() != Some(creator.as_str())
        {
            return false;
        }
        if let Some(status) = &self.status
            && !status.matches(item)
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                [item.title.as_deref(), item.creator.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|hay| hay.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// Partial filter update.
///
/// Outer `None` leaves a field untouched; for clearable fields an inner `None`
/// clears it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterPatch {
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    pub search: Option<Option<String>>,
    pub platform: Option<Option<String>>,
    pub creator: Option<Option<String>>,
    pub status: Option<Option<StatusFilter>>,
}

impl FilterPatch {
    pub fn sort(sort_by: SortField, sort_order: SortOrder) -> Self {
        Self {
            sort_by: Some(sort_by),
            sort_order: Some(sort_order),
            ..Self::default()
        }
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(Some(text.into())),
            ..Self::default()
        }
    }

    pub fn platform(platform: Option<String>) -> Self {
        Self {
            platform: Some(platform),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
