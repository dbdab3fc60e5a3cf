use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ordered_float::OrderedFloat;

use crate::error::ModelError;

/// Item attributes a gallery can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SortField {
    #[default]
    PublishedAt,
    DownloadedAt,
    Title,
    Size,
    Duration,
}

impl SortField {
    pub fn all() -> &'static [SortField] {
        use SortField::*;
        &[PublishedAt, DownloadedAt, Title, Size, Duration]
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            SortField::PublishedAt => "published_at",
            SortField::DownloadedAt => "downloaded_at",
            SortField::Title => "title",
            SortField::Size => "size",
            SortField::Duration => "duration",
        }
    }

    /// Stable one-byte tag used by the cursor wire format.
    pub fn tag(&self) -> u8 {
        match self {
            SortField::PublishedAt => 1,
            SortField::DownloadedAt => 2,
            SortField::Title => 3,
            SortField::Size => 4,
            SortField::Duration => 5,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(SortField::PublishedAt),
            2 => Some(SortField::DownloadedAt),
            3 => Some(SortField::Title),
            4 => Some(SortField::Size),
            5 => Some(SortField::Duration),
            _ => None,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

impl FromStr for SortField {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::all()
            .iter()
            .copied()
            .find(|field| field.api_name() == s)
            .ok_or_else(|| ModelError::UnknownSortField(s.to_string()))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Orient an ascending comparison for this direction.
    pub fn apply(&self, ascending: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ascending,
            SortOrder::Descending => ascending.reverse(),
        }
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

impl FromStr for SortOrder {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(ModelError::UnknownSortOrder(other.to_string())),
        }
    }
}

/// Value of an item's active sort attribute.
///
/// `Null` is the minimal value: it sorts before every populated value, so
/// items lacking the attribute gather at the head of an ascending sweep and
/// at the tail of a descending one. Variant order matters for the derived
/// `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value"))]
pub enum SortValue {
    Null,
    Integer(i64),
    Float(OrderedFloat<f64>),
    Text(String),
    /// Milliseconds since the unix epoch.
    Timestamp(i64),
}

impl SortValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SortValue::Null)
    }

    /// Floats that cannot be ordered meaningfully collapse to `Null`.
    pub fn float(value: f64) -> Self {
        if value.is_nan() {
            SortValue::Null
        } else {
            SortValue::Float(OrderedFloat(value))
        }
    }

    /// Empty or whitespace-only text collapses to `Null`.
    pub fn text(value: &str) -> Self {
        if value.trim().is_empty() {
            SortValue::Null
        } else {
            SortValue::Text(value.to_string())
        }
    }
}
