//! Core data model definitions shared across Galleria crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod error;
pub mod events;
pub mod filters;
pub mod ids;
pub mod item;
pub mod page;
pub mod prelude;
pub mod sorting;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use events::{MutationEvent, MutationKind};
pub use filters::{FilterPatch, GalleryFilters, StatusFilter};
pub use ids::ItemId;
pub use item::{ItemStatus, MediaItem};
pub use page::{Cursor, PageResult};
pub use sorting::{SortField, SortOrder, SortValue};
