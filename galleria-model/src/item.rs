use crate::chrono::{DateTime, Utc};
use crate::ids::ItemId;
use crate::sorting::{SortField, SortValue};

/// Edit/process flags carried by every catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemStatus {
    pub edited: bool,
    pub processed: bool,
    /// Soft-deleted. Catalogs exclude trashed items from pages.
    pub trashed: bool,
}

/// A video in the catalog.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaItem {
    pub id: ItemId,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub title: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub creator: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub platform: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub published_at: Option<DateTime<Utc>>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub downloaded_at: Option<DateTime<Utc>>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub size_bytes: Option<u64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub duration_secs: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: ItemStatus,
}

impl MediaItem {
    /// Bare item with every optional attribute unset.
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            title: None,
            creator: None,
            platform: None,
            published_at: None,
            downloaded_at: None,
            size_bytes: None,
            duration_secs: None,
            status: ItemStatus::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_downloaded_at(mut self, at: DateTime<Utc>) -> Self {
        self.downloaded_at = Some(at);
        self
    }

    pub fn with_size_bytes(mut self, size: u64) -> Self {
        self.size_bytes = Some(size);
        self
    }

    pub fn with_duration_secs(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn is_trashed(&self) -> bool {
        self.status.trashed
    }

    /// Value of the given sort attribute; absent attributes are `Null`.
    pub fn sort_value(&self, field: SortField) -> SortValue {
        match field {
            SortField::PublishedAt => self
                .published_at
                .map(|at| SortValue::Timestamp(at.timestamp_millis()))
                .unwrap_or(SortValue::Null),
            SortField::DownloadedAt => self
                .downloaded_at
                .map(|at| SortValue::Timestamp(at.timestamp_millis()))
                .unwrap_or(SortValue::Null),
            SortField::Title => self
                .title
                .as_deref()
                .map(SortValue::text)
                .unwrap_or(SortValue::Null),
            SortField::Size => self
                .size_bytes
                .map(|size| {
                    SortValue::Integer(i64::try_from(size).unwrap_or(i64::MAX))
                })
                .unwrap_or(SortValue::Null),
            SortField::Duration => self
                .duration_secs
                .map(SortValue::float)
                .unwrap_or(SortValue::Null),
        }
    }
}
