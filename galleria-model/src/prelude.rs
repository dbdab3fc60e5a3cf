//! Gallery focused snapshot of the types surface.
//! Prefer importing from this module instead of individual tree nodes when
//! wiring a gallery view.

pub use super::events::{MutationEvent, MutationKind};
pub use super::filters::{FilterPatch, GalleryFilters, StatusFilter};
pub use super::ids::ItemId;
pub use super::item::{ItemStatus, MediaItem};
pub use super::page::{Cursor, PageResult};
pub use super::sorting::{SortField, SortOrder, SortValue};
